//! Page rasterisation for the OCR fallback.
//!
//! Each page is rendered into its own PNG inside the document's working
//! directory and wrapped in a [`PageImage`] guard. The guard deletes the file
//! when it goes out of scope, so a page image never outlives the iteration
//! that recognised it, even if recognition fails or panics.

use crate::error::StageError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Renders single PDF pages to image files.
///
/// Implementations are blocking and must be self-contained per call: no
/// document handle or render buffer may be kept between calls.
pub trait PageRasterizer: Send + Sync {
    /// Number of pages in the PDF, or `StageError::Open` if it cannot be loaded.
    fn page_count(&self, pdf: &Path) -> Result<usize, StageError>;

    /// Render 1-indexed `page_num` of `pdf` and write it as an image to `dest`.
    fn rasterize(&self, pdf: &Path, page_num: usize, dest: &Path) -> Result<(), StageError>;
}

/// A rendered page on disk. Deleted on drop.
#[derive(Debug)]
pub struct PageImage {
    page_num: usize,
    path: PathBuf,
}

impl PageImage {
    pub fn page_num(&self) -> usize {
        self.page_num
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PageImage {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Released page image {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Could not delete page image {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// File name of page `page_num` inside a working directory.
pub fn page_image_path(work_dir: &Path, page_num: usize) -> PathBuf {
    work_dir.join(format!("page-{page_num:04}.png"))
}

/// Count pages on the blocking pool.
pub async fn page_count(
    rasterizer: &Arc<dyn PageRasterizer>,
    pdf: &Path,
) -> Result<usize, StageError> {
    let rasterizer = Arc::clone(rasterizer);
    let path = pdf.to_path_buf();

    tokio::task::spawn_blocking(move || rasterizer.page_count(&path))
        .await
        .map_err(|e| StageError::Open {
            detail: format!("page count task panicked: {e}"),
        })?
}

/// Rasterise one page on the blocking pool.
///
/// The guard is created *before* rendering, so a half-written file from a
/// failed render is removed as well.
pub async fn render_page(
    rasterizer: &Arc<dyn PageRasterizer>,
    pdf: &Path,
    page_num: usize,
    work_dir: &Path,
) -> Result<PageImage, StageError> {
    let image = PageImage {
        page_num,
        path: page_image_path(work_dir, page_num),
    };

    let rasterizer = Arc::clone(rasterizer);
    let pdf = pdf.to_path_buf();
    let dest = image.path.clone();

    tokio::task::spawn_blocking(move || rasterizer.rasterize(&pdf, page_num, &dest))
        .await
        .map_err(|e| StageError::PageRender {
            page: page_num,
            detail: format!("render task panicked: {e}"),
        })??;

    if !image.path.exists() {
        return Err(StageError::PageRender {
            page: page_num,
            detail: "rasterizer reported success but wrote no image".into(),
        });
    }

    Ok(image)
}
