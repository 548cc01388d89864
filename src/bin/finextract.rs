//! CLI binary for finextract.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ClientConfig`, drives one extraction and prints the tables.

use anyhow::{Context, Result};
use clap::Parser;
use finextract::config::DEFAULT_BASE_URL;
use finextract::{
    ClientConfig, ExtractionController, ExtractionResult, HttpBackend, LifecycleObserver,
    ObserverHandle, PageCounterKind, TableView,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
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

// ── CLI lifecycle observer using indicatif ───────────────────────────────────

/// Terminal observer: a spinner while the file is inspected, then a
/// percentage bar whose message is the rotating status line.
struct CliObserver {
    bar: ProgressBar,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(100);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Checking");
        bar.set_message("Reading PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn activate_bar(&self) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_position(0);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
        self.bar.reset_elapsed();
    }
}

impl LifecycleObserver for CliObserver {
    fn on_processing_start(&self, file_name: &str, page_count: usize) {
        self.activate_bar();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Uploading {file_name} ({page_count} pages)…"))
        ));
    }

    fn on_progress(&self, percent: u8) {
        self.bar.set_position(u64::from(percent));
    }

    fn on_status(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    fn on_complete(&self, total_rows: usize) {
        self.bar.set_position(100);
        self.bar
            .finish_with_message(green(&format!("done — {total_rows} rows")));
    }

    fn on_failed(&self, _user_message: &str) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract tables and save the workbook in the current directory
  finextract annual_report.pdf

  # Save the workbook somewhere else
  finextract q3.pdf --output-dir reports/

  # Tables as JSON, no workbook
  finextract --json --no-export q3.pdf > tables.json

  # Talk to a remote backend
  finextract --api-base-url https://extract.example.com q3.pdf

  # Is the backend up?
  finextract --check-health

LIMITS:
  Files must be PDFs of at most 10 pages and 20 MB. Larger files are
  rejected before anything is uploaded.

ENVIRONMENT VARIABLES:
  FINEXTRACT_API_BASE_URL   Backend origin (default http://localhost:8000)
  FINEXTRACT_OUTPUT_DIR     Directory for exported workbooks
  RUST_LOG                  Override log filtering (e.g. finextract=debug)
"#;

/// Extract financial tables from a PDF through the extraction service.
#[derive(Parser, Debug)]
#[command(
    name = "finextract",
    version,
    about = "Extract financial statement tables from a PDF",
    long_about = "Upload a financial PDF (up to 10 pages) to the extraction service, \
show the profit & loss, balance sheet, cash flow and other tables it finds, and save \
the Excel workbook it returns.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file to extract.
    #[arg(required_unless_present = "check_health")]
    input: Option<PathBuf>,

    /// Extraction service origin.
    #[arg(long, env = "FINEXTRACT_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    api_base_url: String,

    /// Directory the Excel workbook is written to.
    #[arg(long, env = "FINEXTRACT_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Do not write the Excel workbook.
    #[arg(long, env = "FINEXTRACT_NO_EXPORT")]
    no_export: bool,

    /// Print the extracted tables as JSON instead of text.
    #[arg(long, env = "FINEXTRACT_JSON")]
    json: bool,

    /// Maximum accepted page count.
    #[arg(long, env = "FINEXTRACT_MAX_PAGES", default_value_t = 10,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_pages: u32,

    /// Parser used to count pages before upload.
    #[arg(long, env = "FINEXTRACT_PAGE_COUNTER", value_enum, default_value = "lopdf")]
    page_counter: PageCounterArg,

    /// Disable progress bar.
    #[arg(long, env = "FINEXTRACT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FINEXTRACT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, env = "FINEXTRACT_QUIET")]
    quiet: bool,

    /// Probe the backend health endpoint and exit.
    #[arg(long)]
    check_health: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum PageCounterArg {
    Lopdf,
    #[cfg(feature = "pdfium")]
    Pdfium,
}

impl From<PageCounterArg> for PageCounterKind {
    fn from(v: PageCounterArg) -> Self {
        match v {
            PageCounterArg::Lopdf => PageCounterKind::Lopdf,
            #[cfg(feature = "pdfium")]
            PageCounterArg::Pdfium => PageCounterKind::Pdfium,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level lifecycle logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.check_health;
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

    let observer = show_progress.then(CliObserver::new);
    let config = build_config(
        &cli,
        observer.clone().map(|o| o as ObserverHandle),
    )?;

    // ── Health probe ─────────────────────────────────────────────────────
    if cli.check_health {
        let backend = HttpBackend::new(&config).context("Failed to build HTTP client")?;
        let health = backend
            .health()
            .await
            .with_context(|| format!("Backend at {} is unreachable", config.base_url))?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&health).context("Failed to serialise health")?
            );
        } else {
            println!(
                "{} {}  {}",
                if health.is_ok() { green("✔") } else { red("✘") },
                bold(&config.base_url),
                dim(&format!(
                    "status={} service={}",
                    health.status,
                    health.service.as_deref().unwrap_or("-")
                )),
            );
        }
        if !health.is_ok() {
            anyhow::bail!("Backend reported status '{}'", health.status);
        }
        if cli.input.is_none() {
            return Ok(());
        }
    }

    let Some(ref input) = cli.input else {
        return Ok(());
    };
    let grace = config.completion_grace;
    let controller = ExtractionController::http(config).context("Failed to build HTTP client")?;

    // ── File intake ──────────────────────────────────────────────────────
    if let Err(e) = controller.select_path(input).await {
        if let Some(ref o) = observer {
            o.bar.finish_and_clear();
        }
        eprintln!("{} {}", red("✘"), e.user_message());
        return Err(e).with_context(|| format!("Rejected {}", input.display()));
    }

    // ── Extraction ───────────────────────────────────────────────────────
    let result = match controller.process().await {
        Ok(result) => result,
        Err(e) => {
            eprintln!("{} {}", red("✘"), e.user_message());
            return Err(e).context("Extraction failed");
        }
    };

    if let Some(ref o) = observer {
        tokio::time::sleep(grace).await;
        o.bar.finish_and_clear();
    }

    // ── Output ───────────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialise tables")?;
        println!("{json}");
    } else {
        print_tables(&result);
    }

    if !cli.no_export {
        match controller
            .export(&cli.output_dir)
            .context("Failed to export workbook")?
        {
            Some(path) if !cli.quiet => {
                eprintln!("{}  saved  →  {}", green("✔"), bold(&path.display().to_string()));
            }
            None if !cli.quiet => {
                eprintln!("{}", dim("No workbook returned; nothing exported"));
            }
            _ => {}
        }
    }

    Ok(())
}

/// Map CLI args to `ClientConfig`.
fn build_config(cli: &Cli, observer: Option<ObserverHandle>) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder()
        .base_url(cli.api_base_url.clone())
        .max_pages(cli.max_pages as usize)
        .page_counter(cli.page_counter.clone().into());

    if let Some(o) = observer {
        builder = builder.observer(o);
    }

    builder.build().context("Invalid configuration")
}

/// One titled, aligned table per non-empty category.
fn print_tables(result: &ExtractionResult) {
    let mut printed = false;
    for category in result.non_empty_categories() {
        let view = TableView::from_rows(result.rows(category));
        if printed {
            println!();
        }
        println!("{}", bold(category.label()));
        print!("{}", view.render_text());
        printed = true;
    }
    if !printed {
        eprintln!("{}", dim("No financial tables were found in this document"));
    }
}
