//! pdfium-backed text layer reader and page rasteriser.
//!
//! One backend serves both PDF stages. Every call binds pdfium, loads the
//! document, does its one job and drops everything again, so no document
//! handle, page or bitmap survives between calls. Binding failures surface as
//! the calling stage's [`StageError`], which the pipeline absorbs, instead of
//! the panic `Pdfium::default()` would raise.

use crate::config::ExtractionConfig;
use crate::error::StageError;
use crate::pipeline::native::NativeTextExtractor;
use crate::pipeline::render::PageRasterizer;
use image::{DynamicImage, ImageFormat};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming the pdfium library (file or directory).
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Reads and renders PDFs through pdfium.
#[derive(Debug, Clone)]
pub struct PdfiumBackend {
    lib_path: Option<PathBuf>,
    password: Option<String>,
    render_scale: f32,
    max_rendered_pixels: u32,
}

impl PdfiumBackend {
    /// Build a backend from the extraction settings.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            lib_path: config
                .pdfium_lib_path
                .clone()
                .or_else(|| std::env::var_os(PDFIUM_LIB_PATH_ENV).map(PathBuf::from)),
            password: config.password.clone(),
            render_scale: config.render_scale(),
            max_rendered_pixels: config.max_rendered_pixels,
        }
    }

    fn bind(&self) -> Result<Pdfium, String> {
        let bindings = match self.lib_path {
            Some(ref p) => {
                let lib = if p.is_dir() {
                    Pdfium::pdfium_platform_library_name_at_path(p)
                } else {
                    p.clone()
                };
                Pdfium::bind_to_library(&lib)
                    .map_err(|e| format!("cannot load pdfium from '{}': {e:?}", lib.display()))?
            }
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library())
                .map_err(|e| {
                    format!("no pdfium library found (set {PDFIUM_LIB_PATH_ENV}): {e:?}")
                })?,
        };
        Ok(Pdfium::new(bindings))
    }

    fn load<'a>(&'a self, pdfium: &'a Pdfium, pdf: &Path) -> Result<PdfDocument<'a>, String> {
        pdfium
            .load_pdf_from_file(pdf, self.password.as_deref())
            .map_err(|e| format!("{e:?}"))
    }

    fn render_config(&self) -> PdfRenderConfig {
        let cap = self.max_rendered_pixels as i32;
        PdfRenderConfig::new()
            .scale_page_by_factor(self.render_scale)
            .set_maximum_width(cap)
            .set_maximum_height(cap)
    }
}

impl NativeTextExtractor for PdfiumBackend {
    fn extract_text(&self, pdf: &Path) -> Result<String, StageError> {
        let parse_err = |detail: String| StageError::Parse { detail };

        let pdfium = self.bind().map_err(parse_err)?;
        let document = self.load(&pdfium, pdf).map_err(parse_err)?;

        let mut pages_text = Vec::new();
        for (idx, page) in document.pages().iter().enumerate() {
            let text = page
                .text()
                .map_err(|e| parse_err(format!("page {}: {e:?}", idx + 1)))?;
            pages_text.push(text.all());
        }

        info!(
            "Read text layer of {} ({} pages)",
            pdf.display(),
            pages_text.len()
        );
        Ok(pages_text.join("\n"))
    }
}

impl PageRasterizer for PdfiumBackend {
    fn page_count(&self, pdf: &Path) -> Result<usize, StageError> {
        let open_err = |detail: String| StageError::Open { detail };

        let pdfium = self.bind().map_err(open_err)?;
        let document = self.load(&pdfium, pdf).map_err(open_err)?;
        Ok(document.pages().len() as usize)
    }

    fn rasterize(&self, pdf: &Path, page_num: usize, dest: &Path) -> Result<(), StageError> {
        let render_err = |detail: String| StageError::PageRender {
            page: page_num,
            detail,
        };

        if page_num == 0 {
            return Err(render_err("page numbers are 1-indexed".into()));
        }

        let pdfium = self.bind().map_err(render_err)?;
        let document = self.load(&pdfium, pdf).map_err(render_err)?;
        let pages = document.pages();

        let index = u16::try_from(page_num - 1)
            .map_err(|_| render_err(format!("page {page_num} exceeds pdfium's page index range")))?;
        let page = pages.get(index).map_err(|e| render_err(format!("{e:?}")))?;

        let bitmap = page
            .render_with_config(&self.render_config())
            .map_err(|e| render_err(format!("{e:?}")))?;

        // Grayscale keeps the PNG small; Tesseract binarises anyway.
        let image = DynamicImage::ImageLuma8(bitmap.as_image().to_luma8());
        debug!(
            "Rendered page {} → {}x{} px",
            page_num,
            image.width(),
            image.height()
        );

        image
            .save_with_format(dest, ImageFormat::Png)
            .map_err(|e| render_err(format!("cannot write page image: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_prefers_explicit_path() {
        let config = ExtractionConfig::builder()
            .pdfium_lib_path("/opt/pdfium/lib")
            .dpi(216)
            .build()
            .unwrap();
        let backend = PdfiumBackend::from_config(&config);
        assert_eq!(backend.lib_path, Some(PathBuf::from("/opt/pdfium/lib")));
        assert!((backend.render_scale - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn bad_library_path_degrades_to_stage_errors() {
        let config = ExtractionConfig::builder()
            .pdfium_lib_path("/nonexistent/libpdfium.so")
            .build()
            .unwrap();
        let backend = PdfiumBackend::from_config(&config);

        let err = backend.extract_text(Path::new("x.pdf")).unwrap_err();
        assert!(matches!(err, StageError::Parse { .. }));

        let err = backend.page_count(Path::new("x.pdf")).unwrap_err();
        assert!(matches!(err, StageError::Open { .. }));
    }

    #[test]
    fn password_is_forwarded_to_the_loader() {
        let config = ExtractionConfig::builder()
            .pdfium_lib_path("/nonexistent/libpdfium.so")
            .password("s3cret")
            .build()
            .unwrap();
        let backend = PdfiumBackend::from_config(&config);
        assert_eq!(backend.password.as_deref(), Some("s3cret"));
        // Binding fails first, so the borrowed password never reaches pdfium.
        assert!(backend.extract_text(Path::new("locked.pdf")).is_err());
    }

    #[test]
    fn page_zero_is_rejected_before_binding() {
        let backend = PdfiumBackend::from_config(&ExtractionConfig::default());
        let err = backend
            .rasterize(Path::new("x.pdf"), 0, Path::new("/tmp/never.png"))
            .unwrap_err();
        assert!(matches!(err, StageError::PageRender { page: 0, .. }));
    }
}
