//! Error types for the ratecon-extract library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExtractError`]: **Fatal**, and only ever raised *outside* the
//!   extraction core: the input could not be staged (missing file, failed
//!   download, unsupported MIME type), the summarizer is not configured, or
//!   the CLI could not write its output.
//!
//! * [`StageError`]: **Non-fatal**: one stage of the pipeline failed for one
//!   document or one page (unparseable text layer, a page that will not
//!   render, an OCR engine that gave up). These are absorbed by the
//!   coordinator and kept inside [`crate::output::PageOutcome`] so the caller
//!   can still see *why* a block is empty.
//!
//! The extraction entry points never return `Err` for a stage failure; total
//! failure is reported as an empty transcript.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors raised around the extraction core.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// The document kind could not be determined from name, MIME type or content.
    #[error("Cannot tell whether '{input}' is a PDF or an image.\nPass --kind pdf|image.")]
    UnknownKind { input: String },

    /// The upstream front end handed over a MIME type the pipeline does not accept.
    #[error("Unsupported document type '{mime}': send a PDF or a photo")]
    UnsupportedMime { mime: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// Writing the document into its staging directory failed.
    #[error("Failed to stage document: {source}")]
    StagingFailed {
        #[source]
        source: std::io::Error,
    },

    /// A streaming caller asked for pages of a PDF that cannot be opened.
    #[error("Document could not be opened: {0}")]
    Unreadable(#[from] StageError),

    // ── Summarizer errors ─────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API failed on every attempt.
    #[error("Summarizer failed after {attempts} attempts: {message}")]
    SummaryFailed { attempts: u32, message: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal failure of one pipeline stage.
///
/// `page` fields are 1-indexed. `Recognition` carries `None` when the
/// recognizer was fed an uploaded photo rather than a rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum StageError {
    /// The PDF text layer could not be parsed.
    #[error("native text extraction failed: {detail}")]
    Parse { detail: String },

    /// The PDF could not be opened for rasterisation (page count unknown).
    #[error("cannot open PDF for rasterisation: {detail}")]
    Open { detail: String },

    /// One page failed to rasterise.
    #[error("page {page}: rasterisation failed: {detail}")]
    PageRender { page: usize, detail: String },

    /// The OCR engine failed on one image.
    #[error("{}recognition failed: {detail}", page.map(|p| format!("page {p}: ")).unwrap_or_default())]
    Recognition { page: Option<usize>, detail: String },
}

impl StageError {
    /// Attach a page number to a recognition failure raised by a page-agnostic recognizer.
    pub fn on_page(self, page_num: usize) -> Self {
        match self {
            StageError::Recognition { detail, .. } => StageError::Recognition {
                page: Some(page_num),
                detail,
            },
            other => other,
        }
    }
}
