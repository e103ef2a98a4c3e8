//! # ratecon-extract
//!
//! Turn freight rate confirmations (text PDFs, scanned PDFs or phone photos)
//! into a plain-text transcript, and optionally into a dispatcher summary.
//!
//! ## Why this crate?
//!
//! Rate confirmations arrive in every shape. Some are generated PDFs with a
//! clean text layer, some are scans with no text at all, and many are photos
//! taken in a truck cab. Nothing in the upload says which. This crate tries
//! the cheap path first and falls back to page-by-page OCR only when the
//! text layer is missing or too short, so the caller always gets the best
//! transcript available, or an empty one when nothing could be read.
//!
//! ## Pipeline Overview
//!
//! ```text
//! document
//!  │
//!  ├─ 1. Input     local file, URL or in-memory upload → DocumentRef
//!  ├─ 2. Native    pdfium text layer (PDF only)
//!  │        └─ fewer than min_text_chars, or unparseable:
//!  ├─ 3. Render    rasterise each page via pdfium (spawn_blocking)
//!  ├─ 4. OCR       Tesseract per page, strictly in order
//!  ├─ 5. Clean     deterministic OCR text cleanup
//!  └─ 6. Output    "--- Page N ---" transcript + per-page outcomes
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ratecon_extract::{extract, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::default();
//!     let output = extract("ratecon.pdf", None, &config).await?;
//!     if output.is_empty() {
//!         eprintln!("nothing readable");
//!     } else {
//!         println!("{}", output.text);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature   | Default | Description |
//! |-----------|---------|-------------|
//! | `cli`     | on      | Enables the `ratecon` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `leptess` | off     | In-process Tesseract via `leptess` instead of the `tesseract` executable |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! ratecon-extract = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, SummaryConfig, DEFAULT_MIN_TEXT_CHARS};
pub use dispatch::{handle_upload, DispatchReply};
pub use error::{ExtractError, StageError};
pub use extract::{
    extract, extract_from_bytes, extract_sync, extract_to_file, write_output, Extractor,
};
pub use output::{
    ExtractionOutput, ExtractionPath, ExtractionStats, FallbackReason, PageBlock, PageOutcome,
};
pub use pipeline::input::{DocumentKind, DocumentRef};
pub use pipeline::llm::{LlmSummarizer, Summarizer};
pub use pipeline::native::NativeTextExtractor;
pub use pipeline::recognize::ImageRecognizer;
pub use pipeline::render::PageRasterizer;
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{extract_pages_stream, extract_stream, PageStream};
