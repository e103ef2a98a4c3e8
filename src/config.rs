//! Configuration types for document extraction and summarisation.
//!
//! Extraction behaviour is controlled through [`ExtractionConfig`], built via
//! [`ExtractionConfigBuilder`]. Only two knobs change *what* the pipeline
//! produces: the minimum-content threshold that decides when native PDF text
//! is good enough, and the rasterisation density used for OCR. Everything else
//! selects or tunes a backend.
//!
//! The summarizer boundary has its own [`SummaryConfig`]; extraction never
//! reads it.

use crate::error::ExtractError;
use crate::pipeline::native::NativeTextExtractor;
use crate::pipeline::recognize::ImageRecognizer;
use crate::pipeline::render::PageRasterizer;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default minimum number of characters native PDF text must contain
/// before OCR is skipped.
pub const DEFAULT_MIN_TEXT_CHARS: usize = 100;

/// Lowest accepted rasterisation density (2× the 72 DPI nominal size).
pub const MIN_DPI: u32 = 144;

/// Highest accepted rasterisation density.
pub const MAX_DPI: u32 = 600;

/// Configuration for extracting a transcript from one document.
///
/// # Example
/// ```rust
/// use ratecon_extract::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .min_text_chars(80)
///     .dpi(200)
///     .ocr_language("eng")
///     .build()
///     .unwrap();
/// assert_eq!(config.min_text_chars, 80);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Native text shorter than this (in characters) triggers OCR. Default: 100.
    /// Must be at least 1.
    ///
    /// Scanned PDFs often still carry a few extractable characters (a header
    /// stamp, producer metadata rendered as text), so a zero-length check
    /// would under-trigger OCR.
    pub min_text_chars: usize,

    /// Rasterisation density in DPI. Range: 144–600. Default: 300.
    ///
    /// Pages are rendered at `dpi / 72` times their nominal size, so never
    /// below 2×. Tesseract loses small print at 1×.
    pub dpi: u32,

    /// Longest edge of a rendered page in pixels. Default: 5000.
    ///
    /// Caps memory for oversized pages (posters, architectural sheets)
    /// regardless of `dpi`.
    pub max_rendered_pixels: u32,

    /// Tesseract language string, e.g. `"eng"` or `"eng+spa"`. Default: `"eng"`.
    pub ocr_language: String,

    /// Tesseract page segmentation mode (0–13). Default: 3 (fully automatic).
    pub page_segmentation_mode: u8,

    /// Directory holding `*.traineddata`. If None, Tesseract's own default is used.
    pub tessdata_dir: Option<PathBuf>,

    /// Path to the pdfium shared library or the directory containing it.
    /// If None, `PDFIUM_LIB_PATH`, the working directory and the system
    /// library are tried in that order.
    pub pdfium_lib_path: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Pre-constructed native text extractor. Defaults to pdfium.
    pub text_extractor: Option<Arc<dyn NativeTextExtractor>>,

    /// Pre-constructed page rasterizer. Defaults to pdfium.
    pub rasterizer: Option<Arc<dyn PageRasterizer>>,

    /// Pre-constructed image recognizer. Defaults to Tesseract.
    pub recognizer: Option<Arc<dyn ImageRecognizer>>,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_text_chars: DEFAULT_MIN_TEXT_CHARS,
            dpi: 300,
            max_rendered_pixels: 5000,
            ocr_language: "eng".to_string(),
            page_segmentation_mode: 3,
            tessdata_dir: None,
            pdfium_lib_path: None,
            password: None,
            download_timeout_secs: 120,
            text_extractor: None,
            rasterizer: None,
            recognizer: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("min_text_chars", &self.min_text_chars)
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("ocr_language", &self.ocr_language)
            .field("page_segmentation_mode", &self.page_segmentation_mode)
            .field("tessdata_dir", &self.tessdata_dir)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "text_extractor",
                &self.text_extractor.as_ref().map(|_| "<dyn NativeTextExtractor>"),
            )
            .field(
                "rasterizer",
                &self.rasterizer.as_ref().map(|_| "<dyn PageRasterizer>"),
            )
            .field(
                "recognizer",
                &self.recognizer.as_ref().map(|_| "<dyn ImageRecognizer>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Scale factor applied to each page's nominal (72 DPI) size.
    pub fn render_scale(&self) -> f32 {
        self.dpi as f32 / 72.0
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn min_text_chars(mut self, n: usize) -> Self {
        self.config.min_text_chars = n;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(MIN_DPI, MAX_DPI);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn page_segmentation_mode(mut self, psm: u8) -> Self {
        self.config.page_segmentation_mode = psm;
        self
    }

    pub fn tessdata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.tessdata_dir = Some(dir.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn text_extractor(mut self, extractor: Arc<dyn NativeTextExtractor>) -> Self {
        self.config.text_extractor = Some(extractor);
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.config.rasterizer = Some(rasterizer);
        self
    }

    pub fn recognizer(mut self, recognizer: Arc<dyn ImageRecognizer>) -> Self {
        self.config.recognizer = Some(recognizer);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if !(MIN_DPI..=MAX_DPI).contains(&c.dpi) {
            return Err(ExtractError::InvalidConfig(format!(
                "DPI must be {MIN_DPI}–{MAX_DPI}, got {}",
                c.dpi
            )));
        }
        if c.min_text_chars == 0 {
            return Err(ExtractError::InvalidConfig(
                "min_text_chars must be at least 1; 0 would accept an empty text layer".into(),
            ));
        }
        if c.page_segmentation_mode > 13 {
            return Err(ExtractError::InvalidConfig(format!(
                "Page segmentation mode must be 0–13, got {}",
                c.page_segmentation_mode
            )));
        }
        if c.ocr_language.trim().is_empty() {
            return Err(ExtractError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Summarizer ───────────────────────────────────────────────────────────

/// Configuration for the transcript → dispatch-summary LLM call.
#[derive(Clone)]
pub struct SummaryConfig {
    /// LLM model identifier. If None, `gpt-4o-mini`.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is auto-detected.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens for the summary. Default: 1024.
    pub max_tokens: usize,

    /// Retries on a failed LLM call. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Replacement for the built-in dispatch prompt. Must contain `{text}`.
    pub prompt_template: Option<String>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.2,
            max_tokens: 1024,
            max_retries: 2,
            retry_backoff_ms: 500,
            prompt_template: None,
        }
    }
}

impl fmt::Debug for SummaryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummaryConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("prompt_template", &self.prompt_template.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ExtractionConfig::default();
        assert_eq!(c.min_text_chars, 100);
        assert_eq!(c.dpi, 300);
        assert_eq!(c.ocr_language, "eng");
        assert!(c.recognizer.is_none());
    }

    #[test]
    fn builder_clamps_dpi() {
        let c = ExtractionConfig::builder().dpi(10).build().unwrap();
        assert_eq!(c.dpi, 144);
        let c = ExtractionConfig::builder().dpi(9000).build().unwrap();
        assert_eq!(c.dpi, 600);
    }

    #[test]
    fn low_dpi_never_renders_below_twice_nominal() {
        for dpi in [72, 100, 143] {
            let c = ExtractionConfig::builder().dpi(dpi).build().unwrap();
            assert_eq!(c.dpi, MIN_DPI);
            assert!(c.render_scale() >= 2.0, "dpi({dpi}) gave scale {}", c.render_scale());
        }
    }

    #[test]
    fn build_rejects_dpi_set_directly_below_floor() {
        let mut builder = ExtractionConfig::builder();
        builder.config.dpi = 100;
        let err = builder.build().unwrap_err();
        assert!(err.to_string().contains("144–600"));
    }

    #[test]
    fn rejects_zero_threshold() {
        let err = ExtractionConfig::builder()
            .min_text_chars(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ExtractError::InvalidConfig(_)));
        assert!(ExtractionConfig::builder().min_text_chars(1).build().is_ok());
    }

    #[test]
    fn render_scale_is_relative_to_72_dpi() {
        let c = ExtractionConfig::builder().dpi(144).build().unwrap();
        assert!((c.render_scale() - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn rejects_bad_psm() {
        let err = ExtractionConfig::builder()
            .page_segmentation_mode(14)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("0–13"));
    }

    #[test]
    fn rejects_empty_language() {
        assert!(ExtractionConfig::builder().ocr_language("  ").build().is_err());
    }

    #[test]
    fn debug_redacts_password() {
        let c = ExtractionConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn summary_defaults() {
        let s = SummaryConfig::default();
        assert!((s.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(s.max_retries, 2);
    }
}
