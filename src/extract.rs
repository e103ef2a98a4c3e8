//! Extraction coordinator: the public entry point for one document.
//!
//! ## Path selection
//!
//! ```text
//! Start ──image──▶ recognize ─────────────────────────────────▶ Done
//!   │
//!   └─pdf──▶ native text ──(≥ min_text_chars)─────────────────▶ Done
//!                 │
//!                 └─(shorter, or parse error)──▶ OcrFallback ──▶ Done
//! ```
//!
//! Every stage failure is absorbed here. The caller gets a transcript, and
//! an empty transcript is the one and only failure signal. The
//! [`DocumentRef`] is taken by value and dropped before the coordinator
//! returns, so a staged upload is removed on every path.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::output::{ExtractionOutput, ExtractionPath, ExtractionStats, FallbackReason};
use crate::pipeline::input::{self, DocumentKind, DocumentRef};
use crate::pipeline::native::{self, NativeTextExtractor};
use crate::pipeline::ocr;
use crate::pipeline::pdfium::PdfiumBackend;
use crate::pipeline::recognize::{self, ImageRecognizer};
use crate::pipeline::render::PageRasterizer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Turns documents into transcripts.
///
/// Cheap to clone and safe to share between tasks; each call is independent
/// and keeps its temporary files in its own directories.
#[derive(Clone)]
pub struct Extractor {
    config: ExtractionConfig,
    text_extractor: Arc<dyn NativeTextExtractor>,
    rasterizer: Arc<dyn PageRasterizer>,
    recognizer: Arc<dyn ImageRecognizer>,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Extractor {
    /// Build an extractor, filling unset backends with pdfium and Tesseract.
    pub fn new(config: ExtractionConfig) -> Self {
        let pdfium = Arc::new(PdfiumBackend::from_config(&config));
        let text_extractor = config
            .text_extractor
            .clone()
            .unwrap_or_else(|| pdfium.clone() as Arc<dyn NativeTextExtractor>);
        let rasterizer = config
            .rasterizer
            .clone()
            .unwrap_or_else(|| pdfium as Arc<dyn PageRasterizer>);
        let recognizer = config
            .recognizer
            .clone()
            .unwrap_or_else(|| recognize::default_recognizer(&config));

        Self {
            config,
            text_extractor,
            rasterizer,
            recognizer,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub(crate) fn rasterizer(&self) -> Arc<dyn PageRasterizer> {
        Arc::clone(&self.rasterizer)
    }

    pub(crate) fn recognizer(&self) -> Arc<dyn ImageRecognizer> {
        Arc::clone(&self.recognizer)
    }

    /// Extract a document and return only its transcript (empty on total failure).
    pub async fn extract(&self, doc: DocumentRef) -> String {
        self.extract_detailed(doc).await.text
    }

    /// Extract a document and report how the transcript was produced.
    pub async fn extract_detailed(&self, doc: DocumentRef) -> ExtractionOutput {
        let start = Instant::now();
        let kind = doc.kind();
        info!("Extracting {} document: {}", kind, doc.path().display());

        let progress = self.config.progress_callback.as_ref();
        if let Some(cb) = progress {
            cb.on_extraction_start(kind);
        }

        let mut output = match kind {
            DocumentKind::Image => self.extract_image(doc.path()).await,
            DocumentKind::Pdf => self.extract_pdf(doc.path()).await,
        };
        drop(doc);

        output.stats.chars = output.text.chars().count();
        output.stats.duration_ms = start.elapsed().as_millis() as u64;

        if output.is_empty() {
            warn!("Extraction produced no text ({}ms)", output.stats.duration_ms);
        } else {
            info!(
                "Extraction complete: {} chars via {:?} in {}ms",
                output.stats.chars, output.path, output.stats.duration_ms
            );
        }
        if let Some(cb) = progress {
            cb.on_extraction_complete(output.stats.chars);
        }
        output
    }

    async fn extract_image(&self, image: &Path) -> ExtractionOutput {
        let (text, document_error) =
            match recognize::recognize_image(&self.recognizer, image, None).await {
                Ok(text) => (text, None),
                Err(e) => {
                    warn!("Image recognition failed: {}", e);
                    (String::new(), Some(e))
                }
            };

        ExtractionOutput {
            text,
            kind: DocumentKind::Image,
            path: ExtractionPath::Image,
            pages: Vec::new(),
            document_error,
            stats: ExtractionStats::default(),
        }
    }

    async fn extract_pdf(&self, pdf: &Path) -> ExtractionOutput {
        let progress = self.config.progress_callback.as_ref();
        let threshold = self.config.min_text_chars;

        let reason = match native::extract_native(&self.text_extractor, pdf).await {
            Ok(text) => {
                let chars = text.chars().count();
                if let Some(cb) = progress {
                    cb.on_native_text(chars);
                }
                if chars >= threshold {
                    info!("Using native text layer ({} chars)", chars);
                    return ExtractionOutput {
                        text,
                        kind: DocumentKind::Pdf,
                        path: ExtractionPath::Native,
                        pages: Vec::new(),
                        document_error: None,
                        stats: ExtractionStats::default(),
                    };
                }
                FallbackReason::InsufficientText { chars, threshold }
            }
            Err(error) => {
                warn!("Native text extraction failed: {}", error);
                FallbackReason::ParseFailed { error }
            }
        };

        info!("Falling back to OCR: {}", reason);
        if let Some(cb) = progress {
            cb.on_fallback(&reason.to_string());
        }

        let run = ocr::run_ocr(pdf, self.rasterizer(), self.recognizer(), progress).await;
        let failed = run.failed_pages();

        ExtractionOutput {
            text: run.transcript(),
            kind: DocumentKind::Pdf,
            path: ExtractionPath::OcrFallback { reason },
            stats: ExtractionStats {
                total_pages: run.total_pages,
                recognized_pages: run.pages.len() - failed,
                failed_pages: failed,
                ..Default::default()
            },
            document_error: run.open_error,
            pages: run.pages,
        }
    }
}

/// Extract a local file or URL.
///
/// `kind` overrides detection from extension / content. Errors only when the
/// input cannot be staged; extraction failures yield an empty transcript.
pub async fn extract(
    input_str: impl AsRef<str>,
    kind: Option<DocumentKind>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    let input_str = input_str.as_ref();
    let doc = input::resolve_input(input_str, kind, config.download_timeout_secs).await?;
    Ok(Extractor::new(config.clone()).extract_detailed(doc).await)
}

/// Extract an in-memory upload.
///
/// The bytes are written to a private staging directory that is removed
/// before this returns.
pub async fn extract_from_bytes(
    bytes: &[u8],
    file_name: &str,
    kind: DocumentKind,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    let doc = DocumentRef::stage_bytes(bytes, file_name, kind).await?;
    Ok(Extractor::new(config.clone()).extract_detailed(doc).await)
}

/// Extract and write the transcript to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn extract_to_file(
    input_str: impl AsRef<str>,
    kind: Option<DocumentKind>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    let output = extract(input_str, kind, config).await?;
    write_output(output_path, &output.text).await?;
    Ok(output)
}

/// Write `content` to `path` atomically, creating parent directories.
///
/// The content goes to `<file name>.tmp` next to the target and is renamed
/// over it, so readers never see a partial file. The temp file is removed if
/// the rename fails.
pub async fn write_output(path: impl AsRef<Path>, content: &str) -> Result<(), ExtractError> {
    let path = path.as_ref();
    let write_err = |source| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = temp_sibling(path);
    tokio::fs::write(&tmp_path, content)
        .await
        .map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    input_str: impl AsRef<str>,
    kind: Option<DocumentKind>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(input_str, kind, config))
}
