//! CLI binary for ratecon-extract.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig` / `SummaryConfig` and prints the transcript or summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use ratecon_extract::dispatch::reply_for_transcript;
use ratecon_extract::{
    extract, write_output, DispatchReply, DocumentKind, ExtractionConfig, ExtractionOutput,
    ExtractionPath, ExtractionProgressCallback, LlmSummarizer, ProgressCallback, SummaryConfig,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a spinner while the text layer is read, switching to a
/// page bar if the document falls back to OCR.
struct CliProgressCallback {
    bar: ProgressBar,
    page_started: Mutex<Option<Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening document…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: Mutex::new(None),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("OCR");
        self.bar.reset_eta();
    }

    fn page_elapsed(&self) -> f64 {
        self.page_started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, kind: DocumentKind) {
        self.bar.set_prefix("Extracting");
        self.bar.set_message(match kind {
            DocumentKind::Pdf => "reading text layer…",
            DocumentKind::Image => "recognising image…",
        });
    }

    fn on_native_text(&self, chars: usize) {
        self.bar.println(format!(
            "{} text layer: {}",
            cyan("◆"),
            dim(&format!("{chars} chars"))
        ));
    }

    fn on_fallback(&self, reason: &str) {
        self.bar
            .println(format!("{} {} {}", cyan("⚠"), bold("OCR fallback:"), reason));
    }

    fn on_ocr_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut t) = self.page_started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, chars: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{chars:>5} chars")),
            dim(&format!("{:.1}s", self.page_elapsed())),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(['\u{2026}']).collect()
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{:.1}s", self.page_elapsed())),
        ));
        self.bar.inc(1);
    }

    fn on_extraction_complete(&self, chars: usize) {
        self.bar.finish_and_clear();
        let errors = self.errors.load(Ordering::SeqCst);
        if chars == 0 {
            eprintln!("{} no text could be extracted", red("✘"));
        } else if errors > 0 {
            eprintln!(
                "{} {} chars extracted  ({} pages failed)",
                cyan("⚠"),
                bold(&chars.to_string()),
                red(&errors.to_string())
            );
        } else {
            eprintln!("{} {} chars extracted", green("✔"), bold(&chars.to_string()));
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Transcript to stdout
  ratecon ratecon.pdf

  # A phone photo of a rate confirmation
  ratecon IMG_2041.jpg

  # Transcript to a file
  ratecon ratecon.pdf -o ratecon.txt

  # Dispatcher summary via the LLM (needs an API key)
  ratecon --summarize ratecon.pdf

  # JSON with the extraction path and per-page outcomes
  ratecon --json scanned.pdf > out.json

  # Always OCR unless the text layer is long
  ratecon --min-text-chars 500 ratecon.pdf

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY     OpenAI API key (summarizer default: gpt-4o-mini)
  ANTHROPIC_API_KEY  Anthropic API key
  PDFIUM_LIB_PATH    Path to libpdfium (file or containing directory)
  TESSDATA_PREFIX    Tesseract language data directory
  RUST_LOG           Overrides the log filter

SETUP:
  Text-native PDFs need only the pdfium shared library. Scanned PDFs and
  photos also need the `tesseract` executable on PATH.
"#;

/// Extract text from freight rate confirmations (PDF or image).
#[derive(Parser, Debug)]
#[command(
    name = "ratecon",
    version,
    about = "Extract text from freight rate confirmations (PDF or image)",
    long_about = "Extract a plain-text transcript from a rate confirmation. Text-native PDFs \
are read directly; scanned PDFs and photos go through Tesseract OCR page by page. \
Optionally summarise the transcript into a dispatcher message with an LLM.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file path or HTTP/HTTPS URL.
    input: String,

    /// Document kind. Detected from extension or content if omitted.
    #[arg(long, env = "RATECON_KIND", value_enum)]
    kind: Option<KindArg>,

    /// Native text shorter than this (in characters) triggers OCR.
    #[arg(long, env = "RATECON_MIN_TEXT_CHARS", default_value_t = ratecon_extract::DEFAULT_MIN_TEXT_CHARS)]
    min_text_chars: usize,

    /// Rasterisation DPI for OCR (144–600).
    #[arg(long, env = "RATECON_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(144..=600))]
    dpi: u32,

    /// Tesseract language(s), e.g. eng or eng+spa.
    #[arg(long, env = "RATECON_LANG", default_value = "eng")]
    lang: String,

    /// Tesseract page segmentation mode (0–13).
    #[arg(long, env = "RATECON_PSM", default_value_t = 3,
          value_parser = clap::value_parser!(u8).range(0..=13))]
    psm: u8,

    /// Tesseract language data directory.
    #[arg(long, env = "RATECON_TESSDATA_DIR")]
    tessdata_dir: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "RATECON_PASSWORD")]
    password: Option<String>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "RATECON_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Output structured JSON instead of plain text.
    #[arg(long, env = "RATECON_JSON")]
    json: bool,

    /// Summarise the transcript into a dispatcher message.
    #[arg(long, env = "RATECON_SUMMARIZE")]
    summarize: bool,

    /// LLM model for --summarize (default gpt-4o-mini).
    #[arg(long, env = "RATECON_MODEL")]
    model: Option<String>,

    /// LLM provider for --summarize: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "RATECON_PROVIDER")]
    provider: Option<String>,

    /// Write output to this file instead of stdout.
    #[arg(short, long, env = "RATECON_OUTPUT")]
    output: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "RATECON_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "RATECON_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, env = "RATECON_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Pdf,
    Image,
}

impl From<KindArg> for DocumentKind {
    fn from(v: KindArg) -> Self {
        match v {
            KindArg::Pdf => DocumentKind::Pdf,
            KindArg::Image => DocumentKind::Image,
        }
    }
}

#[derive(serde::Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    extraction: &'a ExtractionOutput,
    #[serde(skip_serializing_if = "Option::is_none")]
    dispatch: Option<&'a DispatchReply>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; -v always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // Resolve the summarizer before extracting so a missing key fails fast.
    let summarizer = if cli.summarize {
        Some(LlmSummarizer::from_config(build_summary_config(&cli)).context("Summarizer setup failed")?)
    } else {
        None
    };

    // ── Run extraction ───────────────────────────────────────────────────
    let output = extract(&cli.input, cli.kind.map(Into::into), &config)
        .await
        .context("Extraction failed")?;

    let reply = match summarizer {
        Some(ref s) => Some(reply_for_transcript(s, &output.text).await),
        None => None,
    };

    // ── Emit ─────────────────────────────────────────────────────────────
    let rendered = if cli.json {
        let report = JsonReport {
            extraction: &output,
            dispatch: reply.as_ref(),
        };
        serde_json::to_string_pretty(&report).context("Failed to serialise output")?
    } else if let Some(ref reply) = reply {
        reply.to_string()
    } else {
        output.text.clone()
    };

    match cli.output {
        Some(ref path) => write_output(path, &rendered)
            .await
            .context("Failed to write output")?,
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(rendered.as_bytes())
                .context("Failed to write to stdout")?;
            if !rendered.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
        }
    }

    if !cli.quiet && !show_progress && !cli.json {
        eprintln!(
            "Extracted {} chars via {} in {}ms",
            output.stats.chars,
            path_label(&output),
            output.stats.duration_ms
        );
        if output.stats.failed_pages > 0 {
            eprintln!("  {} pages failed", output.stats.failed_pages);
        }
    }
    if let Some(ref path) = cli.output {
        if !cli.quiet {
            eprintln!("{}  →  {}", green("✔"), bold(&path.display().to_string()));
        }
    }

    // Empty transcript or failed summary: still print, but signal failure.
    let failed = output.is_empty() || reply.as_ref().is_some_and(|r| !r.is_success());
    if failed {
        std::process::exit(2);
    }
    Ok(())
}

fn path_label(output: &ExtractionOutput) -> &'static str {
    match output.path {
        ExtractionPath::Image => "image OCR",
        ExtractionPath::Native => "text layer",
        ExtractionPath::OcrFallback { .. } => "OCR fallback",
    }
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .min_text_chars(cli.min_text_chars)
        .dpi(cli.dpi)
        .ocr_language(cli.lang.clone())
        .page_segmentation_mode(cli.psm)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref dir) = cli.tessdata_dir {
        builder = builder.tessdata_dir(dir.clone());
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn build_summary_config(cli: &Cli) -> SummaryConfig {
    SummaryConfig {
        model: cli.model.clone(),
        provider_name: cli.provider.clone(),
        ..Default::default()
    }
}
