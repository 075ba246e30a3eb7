//! CLI binary for pdf2md-ollama.
//!
//! A thin shim over the library crate that maps CLI flags (with `.env` and
//! environment fallbacks) to `ConversionConfig` and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2md_ollama::{
    convert, inspect, ConversionConfig, ConversionProgressCallback, FailedPagePolicy,
    ProgressCallback,
};
use std::io;
use std::path::PathBuf;
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
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    page_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    /// Spinner until `on_conversion_start` tells us the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Rendering");
        bar.set_message("Rasterising pages…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: Mutex::new(None),
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
        self.bar.set_prefix("Extracting");
        self.bar.reset_eta();
    }

    fn take_elapsed_secs(&self) -> f64 {
        self.page_started
            .lock()
            .ok()
            .and_then(|mut started| started.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
    }

    fn on_batch_start(&self, batch_index: usize, batch_count: usize, batch_len: usize) {
        self.bar.println(dim(&format!(
            "  batch {}/{} ({} pages)",
            batch_index + 1,
            batch_count,
            batch_len
        )));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut started) = self.page_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, markdown_len: usize) {
        let elapsed = self.take_elapsed_secs();
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{markdown_len:>5} chars")),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let elapsed = self.take_elapsed_secs();

        let msg: String = if error.chars().count() > 80 {
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
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, _total_pages: usize, _success_count: usize) {
        self.bar.finish_and_clear();
    }
}

/// Extract Markdown from a PDF with a vision model over an Ollama-style chat API.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2md",
    version,
    about = "Extract Markdown from PDF pages with a vision model",
    long_about = "Renders every page of a PDF to PNG, sends each image to an Ollama-style \
/api/chat endpoint, and writes the concatenated Markdown to extracted_text.md beside the PDF. \
Variables in a .env file in the working directory are loaded before flags are read.",
    color = clap::ColorChoice::Auto
)]
struct Cli {
    /// PDF file to convert.
    #[arg(default_value = "book.pdf")]
    input: PathBuf,

    /// Chat-completions endpoint, e.g. http://localhost:11434/api/chat.
    #[arg(long, env = "OLLAMA_CHAT_COMPLETIONS_URL")]
    url: Option<String>,

    /// Vision model identifier.
    #[arg(long, env = "OLLAMA_MODEL", default_value = pdf2md_ollama::config::DEFAULT_MODEL)]
    model: String,

    /// Pages per batch in the assembled output.
    #[arg(long, env = "PDF2MD_BATCH_SIZE", default_value_t = 6,
          value_parser = clap::value_parser!(u64).range(1..))]
    batch_size: u64,

    /// Rendering DPI (36–400). 72 renders at the page's native size.
    #[arg(long, env = "PDF2MD_DPI", default_value_t = 72,
          value_parser = clap::value_parser!(u32).range(36..=400))]
    dpi: u32,

    /// Directory for transient page images.
    #[arg(long, env = "PDF2MD_IMAGE_DIR", default_value = "images")]
    image_dir: PathBuf,

    /// Output file name, written beside the PDF.
    #[arg(long, env = "PDF2MD_OUTPUT_NAME", default_value = "extracted_text.md")]
    output_name: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2MD_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "PDF2MD_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Path to a text file containing a custom user prompt.
    #[arg(long, env = "PDF2MD_USER_PROMPT")]
    user_prompt: Option<PathBuf>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "PDF2MD_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Per-request timeout in seconds (default: no explicit timeout).
    #[arg(long, env = "PDF2MD_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// Write an HTML comment in place of pages whose request failed.
    #[arg(long, env = "PDF2MD_MARK_FAILED")]
    mark_failed: bool,

    /// Print the run summary as JSON on stdout.
    #[arg(long, env = "PDF2MD_JSON")]
    json: bool,

    /// Print the page count only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2MD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2MD_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal; variables may come from the shell.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar already reports per-page events, so INFO logs are
    // suppressed while it is active.
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

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let pages = inspect(&cli.input, cli.password.as_deref())
            .await
            .context("Failed to inspect PDF")?;
        if cli.json {
            println!(
                "{}",
                serde_json::json!({ "file": cli.input, "pages": pages })
            );
        } else {
            println!("File:   {}", cli.input.display());
            println!("Pages:  {}", pages);
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Run conversion ───────────────────────────────────────────────────
    let output = convert(&cli.input, &config)
        .await
        .context("Conversion failed")?;
    let stats = &output.stats;

    if cli.json {
        let summary = serde_json::json!({
            "output_path": output.output_path,
            "stats": stats,
            "pages": output.pages,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {}/{} pages  {} batches  {}ms  →  {}",
            if stats.failed_pages == 0 {
                green("✔")
            } else {
                yellow("⚠")
            },
            stats.processed_pages,
            stats.total_pages,
            stats.batch_count,
            stats.total_duration_ms,
            bold(&output.output_path.display().to_string()),
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out",
            dim(&stats.total_prompt_tokens.to_string()),
            dim(&stats.total_completion_tokens.to_string()),
        );
        if stats.failed_pages > 0 {
            let failed: Vec<String> = output
                .failed_pages()
                .map(|p| p.page_num.to_string())
                .collect();
            eprintln!(
                "   {} page(s) failed and are {} in the output: {}",
                red(&stats.failed_pages.to_string()),
                if config.failed_pages == FailedPagePolicy::Marker {
                    "marked"
                } else {
                    "empty"
                },
                failed.join(", ")
            );
        }
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let system_prompt = read_prompt(cli.system_prompt.as_ref()).await?;
    let user_prompt = read_prompt(cli.user_prompt.as_ref()).await?;

    let mut builder = ConversionConfig::builder()
        .model(cli.model.clone())
        .batch_size(usize::try_from(cli.batch_size).context("Batch size too large")?)
        .dpi(cli.dpi)
        .temperature(cli.temperature)
        .image_dir(cli.image_dir.clone())
        .output_file_name(cli.output_name.clone())
        .failed_pages(if cli.mark_failed {
            FailedPagePolicy::Marker
        } else {
            FailedPagePolicy::Empty
        });

    if let Some(url) = cli.url.as_deref().filter(|u| !u.trim().is_empty()) {
        builder = builder.chat_url(url);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }
    if let Some(prompt) = user_prompt {
        builder = builder.user_prompt(prompt);
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn read_prompt(path: Option<&PathBuf>) -> Result<Option<String>> {
    match path {
        Some(path) => Ok(Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read prompt from {:?}", path))?,
        )),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_reproduce_plain_run() {
        let cli = Cli::try_parse_from(["pdf2md"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("book.pdf"));
        assert_eq!(cli.batch_size, 6);
        assert_eq!(cli.image_dir, PathBuf::from("images"));
        assert_eq!(cli.output_name, "extracted_text.md");
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        assert!(Cli::try_parse_from(["pdf2md", "--batch-size", "0", "doc.pdf"]).is_err());
    }

    #[tokio::test]
    async fn build_config_maps_flags() {
        let cli = Cli::try_parse_from([
            "pdf2md",
            "--url",
            "http://127.0.0.1:11434/api/chat",
            "--batch-size",
            "3",
            "--mark-failed",
            "doc.pdf",
        ])
        .unwrap();
        let config = build_config(&cli, None).await.unwrap();
        assert_eq!(config.batch_size, 3);
        assert_eq!(
            config.chat_url.as_deref(),
            Some("http://127.0.0.1:11434/api/chat")
        );
        assert_eq!(config.failed_pages, FailedPagePolicy::Marker);
    }
}
