//! Streaming extraction API: emit OCR pages as they are recognised.
//!
//! A long scanned rate confirmation can take tens of seconds to OCR. The
//! stream lets a caller show pages as they finish instead of waiting for the
//! whole transcript. It always runs the OCR path (no native-text attempt),
//! and pages arrive strictly in page order because they are produced one at
//! a time.
//!
//! The stream owns the [`DocumentRef`] and the OCR working directory; both
//! are released when the stream is dropped, whether or not it was drained.

use crate::config::ExtractionConfig;
use crate::error::{ExtractError, StageError};
use crate::extract::Extractor;
use crate::output::{PageBlock, PageOutcome};
use crate::pipeline::input::{self, DocumentKind, DocumentRef};
use crate::pipeline::ocr::{report_page, OcrSession};
use crate::pipeline::recognize;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of page blocks.
pub type PageStream = Pin<Box<dyn Stream<Item = PageBlock> + Send>>;

struct StreamState {
    session: OcrSession,
    // Held only to keep a staged upload on disk while pages are read.
    _doc: DocumentRef,
    next_page: usize,
    extractor: Extractor,
}

/// OCR a document page by page, yielding each [`PageBlock`] as it completes.
///
/// An image document yields a single block numbered 1. Errors only when a
/// PDF cannot be opened for rasterisation.
pub async fn extract_pages_stream(
    extractor: &Extractor,
    doc: DocumentRef,
) -> Result<PageStream, StageError> {
    if doc.kind() == DocumentKind::Image {
        let recognizer = extractor.recognizer();
        let s = stream::once(async move {
            let outcome = match recognize::recognize_image(&recognizer, doc.path(), Some(1)).await
            {
                Ok(text) => PageOutcome::Recognized { text },
                Err(error) => PageOutcome::Failed { error },
            };
            drop(doc);
            PageBlock {
                page_num: 1,
                outcome,
            }
        });
        return Ok(Box::pin(s));
    }

    let session = OcrSession::open(doc.path(), extractor.rasterizer(), extractor.recognizer()).await?;
    let total = session.total_pages();
    info!("Streaming OCR over {} pages", total);
    if let Some(cb) = extractor.config().progress_callback.as_ref() {
        cb.on_ocr_start(total);
    }

    let state = StreamState {
        session,
        _doc: doc,
        next_page: 1,
        extractor: extractor.clone(),
    };

    let s = stream::unfold(state, |mut state| async move {
        let total = state.session.total_pages();
        if state.next_page > total {
            return None;
        }
        let page_num = state.next_page;
        state.next_page += 1;

        let progress = state.extractor.config().progress_callback.as_ref();
        if let Some(cb) = progress {
            cb.on_page_start(page_num, total);
        }
        let block = state.session.process_page(page_num).await;
        report_page(progress, &block, total);
        Some((block, state))
    });

    Ok(s.boxed())
}

/// Resolve a path or URL and stream its OCR pages.
pub async fn extract_stream(
    input_str: impl AsRef<str>,
    kind: Option<DocumentKind>,
    config: &ExtractionConfig,
) -> Result<PageStream, ExtractError> {
    let input_str = input_str.as_ref();
    info!("Starting streaming extraction: {}", input_str);
    let doc = input::resolve_input(input_str, kind, config.download_timeout_secs).await?;
    let extractor = Extractor::new(config.clone());
    Ok(extract_pages_stream(&extractor, doc).await?)
}
