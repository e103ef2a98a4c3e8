//! Output types: the transcript plus a record of how it was produced.
//!
//! The plain transcript (`ExtractionOutput::text`) is the only thing the
//! upstream front end needs. The rest exists so a failed or suspicious
//! extraction can be diagnosed: which path ran, why OCR was chosen, and what
//! happened to each page.

use crate::error::StageError;
use crate::pipeline::input::DocumentKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which extraction path produced the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum ExtractionPath {
    /// An image was sent straight to the recognizer.
    Image,
    /// The PDF's own text layer was long enough.
    Native,
    /// The PDF went through page-by-page OCR.
    OcrFallback { reason: FallbackReason },
}

/// Why a PDF was handed to OCR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FallbackReason {
    /// The text layer parsed but held fewer than `threshold` characters.
    InsufficientText { chars: usize, threshold: usize },
    /// The text layer could not be parsed.
    ParseFailed { error: StageError },
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::InsufficientText { chars, threshold } => write!(
                f,
                "native text too short ({chars} < {threshold} chars)"
            ),
            FallbackReason::ParseFailed { error } => write!(f, "{error}"),
        }
    }
}

/// Result of one OCR page slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PageOutcome {
    /// Rasterised and recognised. `text` may be empty for a blank page.
    Recognized { text: String },
    /// Rasterisation or recognition failed; the slot is kept with no text.
    Failed { error: StageError },
}

/// One page of an OCR-derived transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageBlock {
    /// 1-indexed page number.
    pub page_num: usize,
    pub outcome: PageOutcome,
}

impl PageBlock {
    /// Recognised text, or `""` for a failed page.
    pub fn text(&self) -> &str {
        match self.outcome {
            PageOutcome::Recognized { ref text } => text,
            PageOutcome::Failed { .. } => "",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, PageOutcome::Failed { .. })
    }

    /// The block as it appears in the transcript: `--- Page N ---\n<text>\n`.
    pub fn render(&self) -> String {
        format!("--- Page {} ---\n{}\n", self.page_num, self.text())
    }
}

/// Assemble page blocks into a transcript.
///
/// Blocks are emitted in the order given, which is page order by
/// construction. If every page failed the transcript is empty.
pub fn assemble_transcript(pages: &[PageBlock]) -> String {
    if pages.iter().all(PageBlock::is_failed) {
        return String::new();
    }
    pages.iter().map(PageBlock::render).collect()
}

/// Statistics for one extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Pages in the PDF (0 for images or when the page count was unavailable).
    pub total_pages: usize,
    /// OCR pages that produced a result (including blank pages).
    pub recognized_pages: usize,
    /// OCR pages that failed to rasterise or recognise.
    pub failed_pages: usize,
    /// Character count of the final transcript.
    pub chars: usize,
    pub duration_ms: u64,
}

/// Full result of extracting one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// The transcript. Empty means total extraction failure.
    pub text: String,
    pub kind: DocumentKind,
    pub path: ExtractionPath,
    /// Per-page outcomes; empty unless the OCR fallback ran.
    pub pages: Vec<PageBlock>,
    /// Document-level stage failure: an image the recognizer rejected, or a
    /// PDF the OCR fallback could not open.
    pub document_error: Option<StageError>,
    pub stats: ExtractionStats,
}

impl ExtractionOutput {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
