//! Image recognition: raster image → text via Tesseract.
//!
//! Every call acquires its own engine and releases it before returning, so
//! the caller never holds an OCR session across pages. Two engines are
//! provided:
//!
//! * [`TesseractCli`] (default) spawns the `tesseract` binary per image.
//!   Nothing is linked at build time; the process exit releases everything.
//! * `LeptessRecognizer` (feature `leptess`) runs Tesseract in-process with a
//!   fresh `LepTess` handle per image.

use crate::config::ExtractionConfig;
use crate::error::StageError;
use crate::pipeline::postprocess;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tracing::debug;

/// Turns one raster image into text.
///
/// Implementations are blocking. A blank image is `Ok("")`, not an error.
pub trait ImageRecognizer: Send + Sync {
    fn recognize(&self, image: &Path) -> Result<String, StageError>;
}

/// Recognise `image` on the blocking pool and normalise the text.
///
/// `page` tags failures with the page number when the image came from the
/// rasteriser; uploaded photos pass `None`.
pub async fn recognize_image(
    recognizer: &Arc<dyn ImageRecognizer>,
    image: &Path,
    page: Option<usize>,
) -> Result<String, StageError> {
    let recognizer = Arc::clone(recognizer);
    let path = image.to_path_buf();

    let raw = tokio::task::spawn_blocking(move || recognizer.recognize(&path))
        .await
        .map_err(|e| StageError::Recognition {
            page,
            detail: format!("recognition task panicked: {e}"),
        })?
        .map_err(|e| match page {
            Some(p) => e.on_page(p),
            None => e,
        })?;

    let text = postprocess::clean_text(&raw);
    debug!(
        "Recognised {} chars from {}",
        text.chars().count(),
        image.display()
    );
    Ok(text)
}

/// Build the default recognizer for `config`.
pub fn default_recognizer(config: &ExtractionConfig) -> Arc<dyn ImageRecognizer> {
    #[cfg(feature = "leptess")]
    {
        Arc::new(LeptessRecognizer::from_config(config))
    }
    #[cfg(not(feature = "leptess"))]
    {
        Arc::new(TesseractCli::from_config(config))
    }
}

// ── tesseract binary ─────────────────────────────────────────────────────

/// Runs `tesseract <image> stdout` once per image.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    program: PathBuf,
    language: String,
    psm: u8,
    tessdata_dir: Option<PathBuf>,
}

impl TesseractCli {
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            program: PathBuf::from("tesseract"),
            language: config.ocr_language.clone(),
            psm: config.page_segmentation_mode,
            tessdata_dir: config.tessdata_dir.clone(),
        }
    }

    /// Use a specific `tesseract` executable instead of the one on `PATH`.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    fn command(&self, image: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.psm.to_string());
        if let Some(ref dir) = self.tessdata_dir {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        cmd
    }
}

impl ImageRecognizer for TesseractCli {
    fn recognize(&self, image: &Path) -> Result<String, StageError> {
        let output = self
            .command(image)
            .output()
            .map_err(|e| StageError::Recognition {
                page: None,
                detail: format!("cannot run '{}': {e}", self.program.display()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StageError::Recognition {
                page: None,
                detail: format!("tesseract exited with {}: {}", output.status, stderr.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

// ── in-process leptess ───────────────────────────────────────────────────

/// In-process Tesseract through `leptess`, one engine per call.
#[cfg(feature = "leptess")]
#[derive(Debug, Clone)]
pub struct LeptessRecognizer {
    language: String,
    psm: u8,
    tessdata_dir: Option<String>,
}

#[cfg(feature = "leptess")]
impl LeptessRecognizer {
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            language: config.ocr_language.clone(),
            psm: config.page_segmentation_mode,
            tessdata_dir: config
                .tessdata_dir
                .as_ref()
                .map(|d| d.to_string_lossy().into_owned()),
        }
    }
}

#[cfg(feature = "leptess")]
impl ImageRecognizer for LeptessRecognizer {
    fn recognize(&self, image: &Path) -> Result<String, StageError> {
        use leptess::{LepTess, Variable};

        let fail = |detail: String| StageError::Recognition { page: None, detail };

        let mut lt = LepTess::new(self.tessdata_dir.as_deref(), &self.language).map_err(|e| {
            fail(format!(
                "cannot initialise Tesseract for '{}': {e}",
                self.language
            ))
        })?;
        lt.set_variable(Variable::TesseditPagesegMode, &self.psm.to_string())
            .map_err(|e| fail(format!("cannot set page segmentation mode: {e}")))?;
        lt.set_image(image)
            .map_err(|e| fail(format!("cannot read image: {e}")))?;
        lt.get_utf8_text()
            .map_err(|e| fail(format!("recognised text is not UTF-8: {e}")))
    }
}
