//! CLI binary for pdf2png.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig`, converts each input and saves the PNGs.

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2png::output::save_png_async;
use pdf2png::pipeline::input::read_document;
use pdf2png::{
    configure_library, convert_many, ConversionConfig, ConversionObserver, ConversionResult,
    Converter, FailureKind, LibraryLocation, RawDocument, RenderQuality, Stage,
};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress observer using indicatif ────────────────────────────────────

/// Drives a progress bar from conversion stage events. Conversions finish
/// out of order, so the bar only counts; per-file lines are printed by
/// `main` as results arrive.
struct CliObserver {
    bar: ProgressBar,
}

impl CliObserver {
    fn new(total: usize) -> Arc<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        let bar = ProgressBar::new(total as u64);
        bar.set_style(style);
        bar.set_prefix("Rendering");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn println(&self, line: String) {
        self.bar.println(line);
    }
}

impl ConversionObserver for CliObserver {
    fn on_stage(&self, name: &str, stage: Stage) {
        match stage {
            Stage::Done => self.bar.inc(1),
            Stage::Start => {}
            other => self.bar.set_message(format!("{name}: {other}")),
        }
    }

    fn on_failed(&self, name: &str, kind: FailureKind, _error: &str) {
        self.bar.set_message(format!("{name}: {kind:?}"));
        self.bar.inc(1);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Preview of one document, written to ./report.png
  pdf2png report.pdf

  # Several documents into a directory, smaller previews
  pdf2png --scale 1 -o previews/ *.pdf

  # Machine-readable results
  pdf2png --json a.pdf b.pdf > results.json

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to libpdfium, or a directory containing it
  RUST_LOG                Log filter (overrides --verbose / --quiet)
"#;

/// Render the first page of PDF files to PNG previews.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2png",
    version,
    about = "Render the first page of PDF files to PNG previews",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF files to convert.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory the PNG files are written to.
    #[arg(short, long, env = "PDF2PNG_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Device pixels per PDF point (0.1–8.0).
    #[arg(long, env = "PDF2PNG_SCALE", default_value_t = pdf2png::config::DEFAULT_SCALE)]
    scale: f32,

    /// Rendering quality: fast or high.
    #[arg(long, env = "PDF2PNG_QUALITY", value_enum, default_value = "high")]
    quality: QualityArg,

    /// Number of documents converted at once.
    #[arg(short, long, env = "PDF2PNG_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// pdfium library file, or a directory containing it.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Seconds allowed for loading pdfium.
    #[arg(long, env = "PDF2PNG_LOAD_TIMEOUT")]
    load_timeout: Option<u64>,

    /// Seconds allowed for opening and rendering each document.
    #[arg(long, env = "PDF2PNG_RENDER_TIMEOUT")]
    render_timeout: Option<u64>,

    /// Print a JSON array of results instead of a summary.
    #[arg(long, env = "PDF2PNG_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2PNG_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2PNG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2PNG_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum QualityArg {
    Fast,
    High,
}

impl From<QualityArg> for RenderQuality {
    fn from(v: QualityArg) -> Self {
        match v {
            QualityArg::Fast => RenderQuality::Fast,
            QualityArg::High => RenderQuality::High,
        }
    }
}

/// One line of `--json` output.
#[derive(Serialize)]
struct JsonEntry {
    input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<PathBuf>,
    #[serde(flatten)]
    result: ConversionResult,
}

#[tokio::main]
async fn main() -> Result<()> {
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
        .with_writer(io::stderr)
        .init();

    if let Some(ref lib) = cli.pdfium_lib {
        configure_library(LibraryLocation::from_path(lib.clone()))
            .context("Failed to configure pdfium")?;
    }

    // ── Read inputs ──────────────────────────────────────────────────────
    let started = Instant::now();
    let total = cli.inputs.len();
    let mut entries: Vec<JsonEntry> = Vec::with_capacity(total);
    let mut documents: Vec<(String, RawDocument)> = Vec::with_capacity(total);

    for path in &cli.inputs {
        match read_document(path).await {
            Ok(source) => documents.push((source.name, source.document)),
            Err(e) => {
                let input = path.display().to_string();
                if !cli.quiet && !cli.json {
                    eprintln!("  {} {}  {}", red("✗"), input, red(&e.to_string()));
                }
                entries.push(JsonEntry {
                    input,
                    output: None,
                    result: ConversionResult::Failed(pdf2png::ConversionFailure {
                        error: e.to_string(),
                        kind: e.kind(),
                    }),
                });
            }
        }
    }

    // ── Build converter ──────────────────────────────────────────────────
    let observer = show_progress.then(|| CliObserver::new(documents.len()));
    let config = build_config(&cli, observer.clone())?;
    let converter = Converter::pdfium(config);

    // ── Convert and save ─────────────────────────────────────────────────
    let mut results = convert_many(&converter, documents, cli.concurrency);
    while let Some((name, result)) = results.next().await {
        let mut output = None;
        let mut result = result;

        if let ConversionResult::Converted(converted) = &result {
            let saved = save_png_async(converted.file.clone(), cli.output_dir.clone()).await;
            converter.registry().revoke(converted.image_url.as_str());
            match saved {
                Ok(path) => output = Some(path),
                Err(e) => {
                    result = ConversionResult::Failed(pdf2png::ConversionFailure {
                        error: e.to_string(),
                        kind: e.kind(),
                    });
                }
            }
        }

        if !cli.quiet && !cli.json {
            let line = match (&output, result.error()) {
                (Some(path), _) => format!(
                    "  {} {}  →  {}  {}",
                    green("✓"),
                    name,
                    bold(&path.display().to_string()),
                    dim(&format!(
                        "{} bytes",
                        result.file().map(|f| f.size()).unwrap_or(0)
                    )),
                ),
                (None, error) => format!(
                    "  {} {}  {}",
                    red("✗"),
                    name,
                    red(error.unwrap_or("unknown error"))
                ),
            };
            match &observer {
                Some(obs) => obs.println(line),
                None => eprintln!("{line}"),
            }
        }

        entries.push(JsonEntry {
            input: name,
            output,
            result,
        });
    }

    if let Some(ref obs) = observer {
        obs.bar.finish_and_clear();
    }

    // ── Report ───────────────────────────────────────────────────────────
    let failed = entries.iter().filter(|e| !e.result.is_success()).count();

    if cli.json {
        let json = serde_json::to_string_pretty(&entries).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        eprintln!(
            "{} {}/{} converted  {}",
            if failed == 0 { green("✔") } else { red("✘") },
            bold(&(total - failed).to_string()),
            total,
            dim(&format!("{}ms", started.elapsed().as_millis())),
        );
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {total} inputs failed");
    }
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, observer: Option<Arc<CliObserver>>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .scale(cli.scale)
        .quality(cli.quality.into());

    if let Some(secs) = cli.load_timeout {
        builder = builder.load_timeout_secs(secs);
    }
    if let Some(secs) = cli.render_timeout {
        builder = builder.render_timeout_secs(secs);
    }
    if let Some(obs) = observer {
        builder = builder.observer(obs as Arc<dyn ConversionObserver>);
    }

    builder.build().context("Invalid configuration")
}
