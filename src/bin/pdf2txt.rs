//! CLI binary for edgequake-pdf2txt.
//!
//! A thin shim over the library crate that maps CLI flags and environment
//! variables to `PipelineConfig` and reports results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2txt::{
    convert, inspect, ExtractionMethod, FailedPagePolicy, OcrMode, PageSeparator, PipelineConfig,
    PipelineProgressCallback, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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

const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per finished page. Pages finish out
/// of order, so start times are tracked per page.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_run_start` tells us the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(SPINNER);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Splitting PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
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
        .tick_strings(SPINNER);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Cleaning");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&page_num))
            .map_or(0.0, |t| t.elapsed().as_secs_f64())
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(
        &self,
        page_num: usize,
        total: usize,
        method: ExtractionMethod,
        text_len: usize,
    ) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<10}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            method.to_string(),
            dim(&format!("{text_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(page_num);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total_pages: usize, success_count: usize) {
        let failed = total_pages.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages cleaned successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages cleaned  ({} failed)",
                if failed == total_pages {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Clean the first PDF found in ./input, write ./output/<name>.txt
  pdf2txt

  # A specific file, English, explicit output
  pdf2txt report.pdf --lang en -o report.txt

  # Scanned book: OCR every page with the LLM, neighbour pages as context
  pdf2txt --ocr-mode llm --ocr-model gpt-4o scan.pdf

  # Resume an interrupted run (reuses work/<name>/raw and clean)
  pdf2txt --resume scan.pdf

  # Inspect PDF metadata (no API key needed)
  pdf2txt --inspect-only report.pdf

OCR MODES:
  auto   embedded text, else tesseract, else LLM OCR when tesseract is missing
  local  embedded text, else tesseract; the page fails without tesseract
  llm    LLM OCR for every page, previous/next pages sent as context

ENVIRONMENT VARIABLES (a .env file in the working directory is loaded):
  OPENAI_API_KEY     OpenAI API key
  LLM_PROVIDER       Provider name (openai, anthropic, gemini, ollama, …)
  LLM_MODEL          Cleanup model (default gpt-4o-mini)
  OCR_LLM_MODEL      LLM OCR model (default: LLM_MODEL)
  OCR_MODE           auto | local | llm
  OCR_LANG           Document language, ISO 639-1 (default es)
  MAX_CONCURRENCY    Pages in flight (default 6)
  MAX_OUTPUT_TOKENS  Max tokens per LLM reply (default 2048)
  PDFIUM_LIB_PATH    Path to libpdfium
"#;

/// Clean up the text of a PDF page by page with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2txt",
    version,
    about = "Extract and LLM-clean the text of a PDF, page by page",
    long_about = "Split a PDF into pages, take each page's embedded text (or OCR it with \
tesseract or a vision LLM), have an LLM correct OCR noise and broken lines, and merge the \
cleaned pages into one text file in page order.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file, or a directory whose first PDF is processed.
    #[arg(default_value = "input", env = "PDF2TXT_INPUT")]
    input: PathBuf,

    /// Output text file. Default: <output-dir>/<pdf stem>.txt
    #[arg(short, long, env = "PDF2TXT_OUTPUT")]
    output: Option<PathBuf>,

    /// Directory for the default output file.
    #[arg(long, env = "PDF2TXT_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Directory for per-page PDFs and raw/clean artifacts.
    #[arg(long, env = "PDF2TXT_WORK_DIR", default_value = "work")]
    work_dir: PathBuf,

    /// Reuse pages and artifacts from an earlier run in the work directory.
    #[arg(long, env = "PDF2TXT_RESUME")]
    resume: bool,

    /// How page text is obtained: auto, local, llm.
    #[arg(long, env = "OCR_MODE", default_value = "auto")]
    ocr_mode: OcrMode,

    /// Document language as an ISO 639-1 code (es, en, fr, …).
    #[arg(long = "lang", env = "OCR_LANG", default_value = "es")]
    language: String,

    /// Cleanup model.
    #[arg(long, env = "LLM_MODEL", default_value = "gpt-4o-mini")]
    model: String,

    /// LLM OCR model. Defaults to --model.
    #[arg(long, env = "OCR_LLM_MODEL")]
    ocr_model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "LLM_PROVIDER",
        long_help = "LLM provider. OpenAI when OPENAI_API_KEY is set, otherwise auto-detected \
          from API key env vars."
    )]
    provider: Option<String>,

    /// Pages processed concurrently.
    #[arg(short, long, env = "MAX_CONCURRENCY", default_value_t = 6)]
    concurrency: usize,

    /// Max LLM output tokens per page.
    #[arg(long, env = "MAX_OUTPUT_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDF2TXT_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Retries per LLM call.
    #[arg(long, env = "PDF2TXT_MAX_RETRIES", default_value_t = 4)]
    max_retries: u32,

    /// Per-call LLM timeout in seconds (0 disables).
    #[arg(long, env = "PDF2TXT_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Rendering DPI for OCR (72–400).
    #[arg(long, env = "PDF2TXT_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Failed pages: placeholder, skip, abort.
    #[arg(long, env = "PDF2TXT_ON_PAGE_FAILURE", default_value = "placeholder")]
    on_page_failure: FailedPagePolicy,

    /// Page separator: formfeed, blank, marker, or a custom string.
    #[arg(long, env = "PDF2TXT_SEPARATOR", default_value = "formfeed")]
    separator: String,

    /// tesseract executable.
    #[arg(long, env = "TESSERACT_PATH", default_value = "tesseract")]
    tesseract: PathBuf,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Print the full result (pages, stats, metadata) as JSON on stdout.
    #[arg(long, env = "PDF2TXT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2TXT_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2TXT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2TXT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
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
        .with_writer(std::io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input, cli.pdfium_lib.as_deref())
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("Input:        {}", cli.input.display());
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let output = convert(&cli.input, &config)
        .await
        .context("Conversion failed")?;

    let output_path = match cli.output {
        Some(ref p) => p.clone(),
        None => default_output_path(&cli.input, &cli.output_dir)?,
    };
    edgequake_pdf2txt::pipeline::merge::write_atomic(&output_path, &output.text)
        .await
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    }

    if !cli.quiet {
        let stats = &output.stats;
        eprintln!(
            "{}  {}/{} pages  ({} embedded, {} OCR, {} resumed)  {}ms  →  {}",
            if stats.failed_pages == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.processed_pages,
            stats.total_pages,
            stats.embedded_pages,
            stats.ocr_pages,
            stats.resumed_pages,
            stats.total_duration_ms,
            bold(&output_path.display().to_string()),
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out",
            dim(&stats.total_input_tokens.to_string()),
            dim(&stats.total_output_tokens.to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .ocr_mode(cli.ocr_mode)
        .language(cli.language.as_str())
        .model(cli.model.as_str())
        .concurrency(cli.concurrency)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .dpi(cli.dpi)
        .work_dir(cli.work_dir.clone())
        .resume(cli.resume)
        .on_page_failure(cli.on_page_failure)
        .page_separator(PageSeparator::parse(&cli.separator))
        .tesseract_path(cli.tesseract.clone());

    if let Some(ref m) = cli.ocr_model {
        builder = builder.ocr_model(m.as_str());
    }
    if let Some(ref p) = cli.provider {
        builder = builder.provider_name(p.as_str());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(lib.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// `<output_dir>/<stem>.txt`, where the stem is the PDF the input resolves to.
fn default_output_path(input: &Path, output_dir: &Path) -> Result<PathBuf> {
    let pdf = edgequake_pdf2txt::pipeline::input::resolve_input(input)
        .context("Failed to resolve input")?;
    let stem = pdf
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    Ok(output_dir.join(format!("{stem}.txt")))
}
