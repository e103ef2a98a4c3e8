//! Native PDF text extraction: read the text layer without rasterising.
//!
//! Text-native rate confirmations (exported from a TMS) carry every word in
//! their content streams, and reading them is orders of magnitude cheaper
//! than OCR. The coordinator always tries this first for PDFs.

use crate::error::StageError;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Reads the embedded text of a PDF.
///
/// Implementations are blocking; the pipeline calls them on Tokio's blocking
/// pool. Returning `Err(StageError::Parse)` sends the document to OCR.
pub trait NativeTextExtractor: Send + Sync {
    /// Return all embedded text of the PDF at `pdf`, pages in order.
    fn extract_text(&self, pdf: &Path) -> Result<String, StageError>;
}

/// Run `extractor` on the blocking pool and trim the result.
pub async fn extract_native(
    extractor: &Arc<dyn NativeTextExtractor>,
    pdf: &Path,
) -> Result<String, StageError> {
    let extractor = Arc::clone(extractor);
    let path = pdf.to_path_buf();

    let text = tokio::task::spawn_blocking(move || extractor.extract_text(&path))
        .await
        .map_err(|e| StageError::Parse {
            detail: format!("text extraction task panicked: {e}"),
        })??;

    let trimmed = text.trim().to_string();
    debug!("Native text layer: {} chars", trimmed.chars().count());
    Ok(trimmed)
}
