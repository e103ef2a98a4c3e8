//! Upload handling for a messaging front end.
//!
//! The front end receives a rate confirmation, tells the user it is working,
//! and later posts one reply. This module is the part of that exchange that
//! does not depend on any chat platform: choosing the document kind from the
//! upload's MIME type, the interim status text, and turning a document into
//! the final reply.
//!
//! An empty transcript is reported as [`DispatchReply::ExtractionFailed`] and
//! the summarizer is never called with it.

use crate::error::ExtractError;
use crate::extract::Extractor;
use crate::pipeline::input::{DocumentKind, DocumentRef};
use crate::pipeline::llm::Summarizer;
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// Interim status shown after a PDF upload.
pub const PDF_RECEIVED: &str = "📄 PDF received. Extracting info... Please wait ⏳";

/// Interim status shown after a photo upload.
pub const IMAGE_RECEIVED: &str = "📷 Image received. Extracting info... Please wait ⏳";

/// Reply when no text could be read from the document.
pub const EXTRACTION_FAILED: &str =
    "⚠️ Could not read any text from this document. Please send a clearer photo or the original PDF.";

/// The single reply sent back for one upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reply", content = "text", rename_all = "snake_case")]
pub enum DispatchReply {
    /// The summarizer's dispatcher message.
    Summary(String),
    /// The transcript was empty.
    ExtractionFailed,
    /// The transcript was read but the summarizer failed.
    SummaryFailed(String),
}

impl DispatchReply {
    pub fn is_success(&self) -> bool {
        matches!(self, DispatchReply::Summary(_))
    }
}

impl fmt::Display for DispatchReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchReply::Summary(text) => f.write_str(text),
            DispatchReply::ExtractionFailed => f.write_str(EXTRACTION_FAILED),
            DispatchReply::SummaryFailed(message) => write!(f, "⚠️ Error: {message}"),
        }
    }
}

/// Map an upload's MIME type to a document kind, rejecting anything else.
pub fn upload_kind(mime: &str) -> Result<DocumentKind, ExtractError> {
    DocumentKind::from_mime(mime).ok_or_else(|| ExtractError::UnsupportedMime {
        mime: mime.to_string(),
    })
}

/// Interim status text for an upload of `kind`.
pub fn status_message(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Pdf => PDF_RECEIVED,
        DocumentKind::Image => IMAGE_RECEIVED,
    }
}

/// Extract `doc` and summarise its transcript.
///
/// Consumes the document; a staged upload is deleted before the summarizer
/// is called.
pub async fn handle_upload(
    extractor: &Extractor,
    summarizer: &dyn Summarizer,
    doc: DocumentRef,
) -> DispatchReply {
    let transcript = extractor.extract(doc).await;
    reply_for_transcript(summarizer, &transcript).await
}

/// Build the reply for an already-extracted transcript.
pub async fn reply_for_transcript(summarizer: &dyn Summarizer, transcript: &str) -> DispatchReply {
    if transcript.is_empty() {
        warn!("Upload produced an empty transcript");
        return DispatchReply::ExtractionFailed;
    }

    match summarizer.summarize(transcript).await {
        Ok(summary) => {
            info!("Summary ready ({} chars)", summary.chars().count());
            DispatchReply::Summary(summary)
        }
        Err(e) => {
            warn!("Summarizer failed: {}", e);
            DispatchReply::SummaryFailed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_kind_rejects_unknown_mime() {
        assert_eq!(upload_kind("application/pdf").unwrap(), DocumentKind::Pdf);
        assert_eq!(upload_kind("image/jpeg").unwrap(), DocumentKind::Image);
        assert!(matches!(
            upload_kind("application/zip"),
            Err(ExtractError::UnsupportedMime { .. })
        ));
    }

    #[test]
    fn status_per_kind() {
        assert!(status_message(DocumentKind::Pdf).starts_with("📄"));
        assert!(status_message(DocumentKind::Image).starts_with("📷"));
    }

    #[test]
    fn reply_text() {
        assert_eq!(
            DispatchReply::SummaryFailed("timeout".into()).to_string(),
            "⚠️ Error: timeout"
        );
        assert_eq!(DispatchReply::ExtractionFailed.to_string(), EXTRACTION_FAILED);
        assert_eq!(DispatchReply::Summary("Load# 1".into()).to_string(), "Load# 1");
        assert!(!DispatchReply::ExtractionFailed.is_success());
    }
}
