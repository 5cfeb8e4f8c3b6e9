//! CLI binary for pdf2md-ocr.
//!
//! Maps flags to `ConversionConfig`, runs the batch and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2md_ocr::config::{DEFAULT_MODEL, DEFAULT_OLLAMA_HOST, DEFAULT_OUTPUT_DIR};
use pdf2md_ocr::pipeline::input::expand_inputs;
use pdf2md_ocr::{
    convert_inputs, inspect_inputs, BatchSummary, ConversionConfig, FileOutcome, FileProgress,
    FilePipeline, FileStatus, PageOutcome, PageProgress, PageResult, PdfiumRasterizer,
    ProgressObserver, Rasterizer,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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

fn clip(msg: &str, max: usize) -> String {
    let first_line = msg.lines().next().unwrap_or_default();
    if first_line.chars().count() > max {
        let head: String = first_line.chars().take(max - 1).collect();
        format!("{head}\u{2026}")
    } else {
        first_line.to_string()
    }
}

// ── Progress observer using indicatif ────────────────────────────────────────

/// One bar per file, reset when the next file starts. Page lines are printed
/// above the bar.
struct CliObserver {
    bar: ProgressBar,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(Self::spinner_style());
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS)
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS)
    }
}

impl ProgressObserver for CliObserver {
    fn on_batch_start(&self, total_files: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {total_files} file(s)…"))
        ));
    }

    fn on_file_start(&self, file: &FileProgress) {
        self.bar.set_style(Self::spinner_style());
        self.bar.set_length(0);
        self.bar.set_position(0);
        self.bar.reset_elapsed();
        self.bar
            .set_prefix(format!("[{}/{}] {}", file.file_num, file.total_files, file.filename));
        self.bar.set_message("opening…");
    }

    fn on_page_start(&self, page: &PageProgress) {
        if self.bar.length() != Some(page.total_pages as u64) {
            self.bar.set_length(page.total_pages as u64);
            self.bar.set_style(Self::bar_style());
        }
        self.bar.set_message(format!("page {}", page.page_num));
    }

    fn on_page_result(&self, page: &PageProgress, result: &PageResult) {
        let secs = dim(&format!("{:.1}s", result.duration_ms as f64 / 1000.0));
        let line = match &result.outcome {
            PageOutcome::Extracted { text } => format!(
                "  {} Page {:>3}/{:<3}  {}  {}",
                green("✓"),
                page.page_num,
                page.total_pages,
                dim(&format!("{:>5} chars", text.len())),
                secs
            ),
            PageOutcome::RenderFailed { reason } | PageOutcome::ExtractionFailed { reason } => {
                format!(
                    "  {} Page {:>3}/{:<3}  {}  {}",
                    red("✗"),
                    page.page_num,
                    page.total_pages,
                    red(&clip(reason, 80)),
                    secs
                )
            }
            PageOutcome::TimedOut { .. } => format!(
                "  {} Page {:>3}/{:<3}  {}  {}",
                red("⏱"),
                page.page_num,
                page.total_pages,
                red("over the page budget, skipping the rest of this file"),
                secs
            ),
        };
        self.bar.println(line);
        self.bar.inc(1);
    }

    fn on_file_complete(&self, outcome: &FileOutcome) {
        let line = match outcome.status {
            FileStatus::Success => format!(
                "{} {}  {} pages  →  {}",
                green("✔"),
                bold(&outcome.filename),
                outcome.total_pages,
                outcome
                    .output_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            ),
            FileStatus::PartialSuccess => format!(
                "{} {}  {}/{} pages  →  {}",
                yellow("⚠"),
                bold(&outcome.filename),
                outcome.extracted_pages(),
                outcome.total_pages,
                outcome
                    .output_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            ),
            FileStatus::Failure => format!(
                "{} {}  {}",
                red("✘"),
                bold(&outcome.filename),
                red(&clip(
                    &outcome
                        .failure
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_default(),
                    100
                ))
            ),
        };
        self.bar.println(line);
    }

    fn on_batch_complete(&self, _summary: &BatchSummary) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r###"EXAMPLES:
  # OCR every PDF in a directory with the default local model
  pdf2md-ocr scans/

  # Pick the model and output directory
  pdf2md-ocr --model llava:13b -o out/ a.pdf b.pdf

  # Slow machine: give each page five minutes
  pdf2md-ocr --page-timeout 300 book.pdf

  # Hosted vision model instead of Ollama
  pdf2md-ocr --provider openai --model gpt-4.1-nano report.pdf

  # Page counts only (no model needed)
  pdf2md-ocr --inspect-only scans/

OUTPUT:
  One <stem>.md per input, containing "# OCR Output for: <file>" and a
  "## Page <n>" section per page. A page that fails gets a placeholder and
  the file is reported as partial. A page that exceeds --page-timeout stops
  that file and nothing is written for it.

ENVIRONMENT VARIABLES:
  PDF2MD_OCR_*        Every flag, e.g. PDF2MD_OCR_MODEL, PDF2MD_OCR_OUTPUT_DIR
  OPENAI_API_KEY      Used with --provider openai (likewise ANTHROPIC_API_KEY, GEMINI_API_KEY)
  PDFIUM_LIB_PATH     Path to libpdfium
  RUST_LOG            Log filter, overrides --verbose/--quiet
"###;

/// OCR PDF files to Markdown with a multimodal model.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2md-ocr",
    version,
    about = "OCR PDF files to Markdown, one page at a time, with a multimodal model",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF files, directories of PDFs, or HTTP/HTTPS URLs.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Directory for the generated Markdown files.
    #[arg(short, long, env = "PDF2MD_OCR_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Multimodal model identifier.
    #[arg(short, long, env = "PDF2MD_OCR_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Extraction provider: ollama (default), openai, anthropic, gemini, …
    #[arg(long, env = "PDF2MD_OCR_PROVIDER")]
    provider: Option<String>,

    /// Ollama base URL.
    #[arg(long, env = "PDF2MD_OCR_OLLAMA_HOST", default_value = DEFAULT_OLLAMA_HOST)]
    ollama_host: String,

    /// Per-page budget in seconds for rendering plus extraction.
    #[arg(long, env = "PDF2MD_OCR_PAGE_TIMEOUT", default_value_t = 120,
          value_parser = clap::value_parser!(u64).range(1..))]
    page_timeout: u64,

    /// Rendering scale relative to the page's native size.
    #[arg(long, env = "PDF2MD_OCR_ZOOM", default_value_t = 2.0)]
    zoom: f32,

    /// Sampling temperature.
    #[arg(long, env = "PDF2MD_OCR_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max output tokens per page (hosted providers).
    #[arg(long, env = "PDF2MD_OCR_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Ollama keep_alive value; "none" omits it.
    #[arg(long, env = "PDF2MD_OCR_KEEP_ALIVE", default_value = "-1m")]
    keep_alive: String,

    /// Text file with a custom extraction instruction.
    #[arg(long, env = "PDF2MD_OCR_INSTRUCTION")]
    instruction_file: Option<PathBuf>,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, env = "PDF2MD_OCR_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print the batch summary as JSON on stdout.
    #[arg(long, env = "PDF2MD_OCR_JSON")]
    json: bool,

    /// Print page counts only; no rendering, no model calls.
    #[arg(long)]
    inspect_only: bool,

    /// Disable the progress bar.
    #[arg(long, env = "PDF2MD_OCR_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2MD_OCR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2MD_OCR_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs when it is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
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

    let inputs = expand_inputs(&cli.inputs);
    if inputs.is_empty() {
        anyhow::bail!("No PDF files found in the given inputs");
    }

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let rasterizer: Arc<dyn Rasterizer> =
            Arc::new(PdfiumRasterizer::new().context("PDFium is not available")?);
        let reports = inspect_inputs(&rasterizer, &inputs, cli.download_timeout).await;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&reports).context("Failed to serialise page counts")?
            );
        } else {
            for report in &reports {
                match (report.pages, &report.error) {
                    (Some(n), _) => println!("{:<40} {:>5} pages", report.filename, n),
                    (None, Some(e)) => println!("{:<40} {}", report.filename, red(&clip(e, 80))),
                    (None, None) => println!("{:<40} ?", report.filename),
                }
            }
        }
        return Ok(());
    }

    // ── Build pipeline ───────────────────────────────────────────────────
    let observer: Option<Arc<dyn ProgressObserver>> = if show_progress {
        Some(CliObserver::new())
    } else {
        None
    };
    let config = build_config(&cli, observer).await?;
    let pipeline = FilePipeline::from_config(config).context("Failed to set up the pipeline")?;

    // ── Run ──────────────────────────────────────────────────────────────
    let summary = convert_inputs(&pipeline, &inputs).await;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !cli.quiet {
        print_summary(&summary);
    }

    if summary.all_failed() {
        anyhow::bail!("All {} file(s) failed", summary.outcomes.len());
    }
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
async fn build_config(
    cli: &Cli,
    observer: Option<Arc<dyn ProgressObserver>>,
) -> Result<ConversionConfig> {
    let keep_alive = match cli.keep_alive.trim() {
        "" | "none" => None,
        other => Some(other.to_string()),
    };

    let mut builder = ConversionConfig::builder()
        .model(cli.model.clone())
        .ollama_host(cli.ollama_host.clone())
        .output_dir(cli.output_dir.clone())
        .page_budget_secs(cli.page_timeout)
        .zoom(cli.zoom)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .keep_alive(keep_alive)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref path) = cli.instruction_file {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read instruction from {:?}", path))?;
        builder = builder.instruction(text.trim().to_string());
    }
    if let Some(observer) = observer {
        builder = builder.progress_observer(observer);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(summary: &BatchSummary) {
    let partial = summary.count(FileStatus::PartialSuccess);
    let full = summary.count(FileStatus::Success);
    let failed = summary.count(FileStatus::Failure);

    println!();
    println!(
        "{}",
        bold(&format!(
            "Processed {} file(s) in {:.1}s",
            summary.outcomes.len(),
            summary.duration_ms as f64 / 1000.0
        ))
    );

    if full + partial > 0 {
        println!("{}", green(&format!("Succeeded ({}):", full + partial)));
        for outcome in summary.succeeded() {
            let path = outcome
                .output_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            if outcome.status == FileStatus::PartialSuccess {
                println!(
                    "  {} {} → {} {}",
                    yellow("⚠"),
                    outcome.filename,
                    path,
                    yellow(&format!(
                        "(partial: {} of {} pages failed)",
                        outcome.failed_pages(),
                        outcome.total_pages
                    ))
                );
            } else {
                println!("  {} {} → {}", green("✔"), outcome.filename, path);
            }
        }
    }

    if failed > 0 {
        println!("{}", red(&format!("Failed ({failed}):")));
        for outcome in summary.failed() {
            let reason = outcome
                .failure
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default();
            println!("  {} {}: {}", red("✘"), outcome.filename, clip(&reason, 100));
        }
    }
}
