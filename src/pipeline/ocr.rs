//! OCR fallback: rasterise and recognise a PDF page by page.
//!
//! Pages run strictly one after another. The recognizer is never called
//! concurrently for one document, and transcript order is the loop order, so
//! no reordering step is needed.
//!
//! A failing page is recorded as [`PageOutcome::Failed`] and the loop moves
//! on; its `--- Page N ---` slot stays in the transcript with an empty body.
//! Rendered images live in a per-document [`TempDir`] and are deleted as soon
//! as their page is recognised; the directory itself goes when the
//! [`OcrSession`] is dropped.

use crate::error::StageError;
use crate::output::{assemble_transcript, PageBlock, PageOutcome};
use crate::pipeline::recognize::{recognize_image, ImageRecognizer};
use crate::pipeline::render::{self, PageRasterizer};
use crate::progress::ProgressCallback;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Result of running OCR over a whole PDF.
#[derive(Debug, Clone)]
pub struct OcrRun {
    /// One block per page, in page order.
    pub pages: Vec<PageBlock>,
    /// Page count reported by the rasterizer (0 if it could not open the PDF).
    pub total_pages: usize,
    /// Set when the PDF could not be opened at all.
    pub open_error: Option<StageError>,
}

impl OcrRun {
    /// The assembled transcript; empty if nothing could be recognised.
    pub fn transcript(&self) -> String {
        assemble_transcript(&self.pages)
    }

    pub fn failed_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.is_failed()).count()
    }
}

/// An opened OCR run over one PDF: page count plus a private working directory.
pub struct OcrSession {
    pdf: PathBuf,
    total_pages: usize,
    work_dir: Result<TempDir, String>,
    rasterizer: Arc<dyn PageRasterizer>,
    recognizer: Arc<dyn ImageRecognizer>,
}

impl OcrSession {
    /// Count the pages of `pdf` and create the working directory.
    pub async fn open(
        pdf: &Path,
        rasterizer: Arc<dyn PageRasterizer>,
        recognizer: Arc<dyn ImageRecognizer>,
    ) -> Result<Self, StageError> {
        let total_pages = render::page_count(&rasterizer, pdf).await?;

        // A missing working dir fails every page rather than the whole run,
        // so the page slots are still reported.
        let work_dir = tempfile::Builder::new()
            .prefix("ratecon-ocr-")
            .tempdir()
            .map_err(|e| format!("cannot create working directory: {e}"));
        if let Ok(ref dir) = work_dir {
            debug!("OCR working directory: {}", dir.path().display());
        }

        Ok(Self {
            pdf: pdf.to_path_buf(),
            total_pages,
            work_dir,
            rasterizer,
            recognizer,
        })
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    /// Working directory holding this run's page images, if it could be created.
    pub fn work_dir(&self) -> Option<&Path> {
        self.work_dir.as_ref().ok().map(|d| d.path())
    }

    /// Rasterise and recognise one 1-indexed page.
    ///
    /// The page image is dropped (and deleted) before this returns, on every path.
    pub async fn process_page(&self, page_num: usize) -> PageBlock {
        let outcome = match self.render_and_recognize(page_num).await {
            Ok(text) => PageOutcome::Recognized { text },
            Err(error) => {
                warn!("Page {}/{}: {}", page_num, self.total_pages, error);
                PageOutcome::Failed { error }
            }
        };
        PageBlock { page_num, outcome }
    }

    async fn render_and_recognize(&self, page_num: usize) -> Result<String, StageError> {
        let work_dir = self
            .work_dir
            .as_ref()
            .map_err(|detail| StageError::PageRender {
                page: page_num,
                detail: detail.clone(),
            })?;

        let image =
            render::render_page(&self.rasterizer, &self.pdf, page_num, work_dir.path()).await?;
        let text = recognize_image(&self.recognizer, image.path(), Some(page_num)).await;
        drop(image);
        text
    }
}

/// Run OCR over every page of `pdf`.
///
/// Never fails: an unopenable PDF yields an empty run with `open_error` set.
pub async fn run_ocr(
    pdf: &Path,
    rasterizer: Arc<dyn PageRasterizer>,
    recognizer: Arc<dyn ImageRecognizer>,
    progress: Option<&ProgressCallback>,
) -> OcrRun {
    let session = match OcrSession::open(pdf, rasterizer, recognizer).await {
        Ok(s) => s,
        Err(e) => {
            warn!("OCR cannot open {}: {}", pdf.display(), e);
            return OcrRun {
                pages: Vec::new(),
                total_pages: 0,
                open_error: Some(e),
            };
        }
    };

    let total = session.total_pages();
    info!("OCR fallback over {} pages", total);
    if let Some(cb) = progress {
        cb.on_ocr_start(total);
    }

    let mut pages = Vec::with_capacity(total);
    for page_num in 1..=total {
        if let Some(cb) = progress {
            cb.on_page_start(page_num, total);
        }
        let block = session.process_page(page_num).await;
        report_page(progress, &block, total);
        pages.push(block);
    }

    let run = OcrRun {
        pages,
        total_pages: total,
        open_error: None,
    };
    info!(
        "OCR complete: {}/{} pages recognised",
        total - run.failed_pages(),
        total
    );
    run
}

/// Forward a finished page to the progress callback.
pub(crate) fn report_page(progress: Option<&ProgressCallback>, block: &PageBlock, total: usize) {
    let Some(cb) = progress else {
        return;
    };
    match block.outcome {
        PageOutcome::Recognized { ref text } => {
            cb.on_page_complete(block.page_num, total, text.chars().count())
        }
        PageOutcome::Failed { ref error } => {
            cb.on_page_error(block.page_num, total, &error.to_string())
        }
    }
}
