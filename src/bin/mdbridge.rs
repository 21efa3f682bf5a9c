//! CLI binary for mdbridge.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionOptions` / `BatchConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use mdbridge::{
    batch_convert, collect_files, BatchConfig, BatchControl, BatchOutput, BatchProgressCallback,
    ConversionOptions, Document, DocumentFormat, ProgressCallback, TagPolicy, TargetFormat,
};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Extensions picked up when a directory is given as input.
const INPUT_EXTENSIONS: &[&str] = &["html", "htm", "md", "markdown"];

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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per file.
/// Files complete out of order when more than one worker runs.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total_files} files…"))
        ));
    }

    fn on_file_start(&self, _index: usize, _total: usize, file: &str) {
        self.bar.set_message(file.to_string());
    }

    fn on_file_complete(&self, index: usize, total: usize, file: &str) {
        self.bar.println(format!(
            "  {} {:>4}/{:<4} {}",
            green("✓"),
            index,
            total,
            dim(file)
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, index: usize, total: usize, file: &str, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Long messages wrap badly under the bar.
        let msg = match error.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };
        self.bar.println(format!(
            "  {} {:>4}/{:<4} {}  {}",
            red("✗"),
            index,
            total,
            file,
            red(&msg)
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, finished: usize, succeeded: usize) {
        self.bar.finish_and_clear();
        let failed = finished.saturating_sub(succeeded);
        let skipped = total.saturating_sub(finished);

        if failed == 0 && skipped == 0 {
            eprintln!(
                "{} {} files converted successfully",
                green("✔"),
                bold(&succeeded.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} files converted  ({} failed, {} skipped)",
                if succeeded == 0 { red("✘") } else { cyan("⚠") },
                bold(&succeeded.to_string()),
                total,
                red(&failed.to_string()),
                skipped,
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert files next to themselves (.html → .md, .md → .html)
  mdbridge page.html notes.md

  # Convert a whole tree into another directory, 4 at a time
  mdbridge -r docs/ -o site/ --base-dir docs/ -w 4

  # Force the direction
  mdbridge --to md export/*.htm

  # Single document through a pipe
  curl -s https://example.com | mdbridge --stdin --from html

  # Resolve relative links and images against a site
  mdbridge --rewrite-paths --base-url https://example.com/docs/ page.md

  # Machine-readable results
  mdbridge --json -r docs/ > results.json

ALLOW-LIST FILE (--allowlist, used with --drop-unknown-tags):
  { "inline": ["a", "strong", "em", "code"], "block": ["p", "h1", "ul", "li"] }

ENVIRONMENT VARIABLES:
  RUST_LOG           Log filter (overrides --verbose / --quiet)
  MDBRIDGE_*         Defaults for most flags, e.g. MDBRIDGE_WORKERS=8
"#;

/// Convert documents between HTML and Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "mdbridge",
    version,
    about = "Convert documents between HTML and Markdown",
    long_about = "Convert HTML files to Markdown and Markdown files to HTML, one at a time \
or as a concurrent batch. The direction is inferred from each file's extension unless \
--to forces it.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input files or directories.
    #[arg(required_unless_present = "stdin")]
    inputs: Vec<PathBuf>,

    /// Output format: auto (by extension), md, html.
    #[arg(long, env = "MDBRIDGE_TO", value_enum, default_value = "auto")]
    to: ToArg,

    /// Descend into subdirectories of directory inputs.
    #[arg(short, long, env = "MDBRIDGE_RECURSIVE")]
    recursive: bool,

    /// Read one document from stdin and write the result to stdout.
    #[arg(long, requires = "from", conflicts_with = "inputs")]
    stdin: bool,

    /// Format of the stdin document.
    #[arg(long, value_enum)]
    from: Option<FromArg>,

    /// Write outputs under this directory instead of next to each input.
    #[arg(short, long = "output-dir", env = "MDBRIDGE_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Base directory: anchors --output-dir layout and resolves relative paths.
    #[arg(long, env = "MDBRIDGE_BASE_DIR")]
    base_dir: Option<PathBuf>,

    /// Base URL relative links and images are joined onto.
    #[arg(long, env = "MDBRIDGE_BASE_URL")]
    base_url: Option<String>,

    /// Rewrite relative link and image references.
    #[arg(long, env = "MDBRIDGE_REWRITE_PATHS")]
    rewrite_paths: bool,

    /// Ignore markup of tags outside the allow-lists (text is kept).
    #[arg(long, env = "MDBRIDGE_DROP_UNKNOWN_TAGS")]
    drop_unknown_tags: bool,

    /// JSON file with "inline" and "block" tag allow-lists.
    #[arg(long, env = "MDBRIDGE_ALLOWLIST")]
    allowlist: Option<PathBuf>,

    /// Number of files converted concurrently.
    #[arg(short, long, env = "MDBRIDGE_WORKERS", default_value_t = 1)]
    workers: usize,

    /// Print the batch results as JSON on stdout.
    #[arg(long, env = "MDBRIDGE_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "MDBRIDGE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MDBRIDGE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MDBRIDGE_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ToArg {
    Auto,
    Md,
    Html,
}

impl From<ToArg> for TargetFormat {
    fn from(v: ToArg) -> Self {
        match v {
            ToArg::Auto => TargetFormat::Auto,
            ToArg::Md => TargetFormat::Markdown,
            ToArg::Html => TargetFormat::Html,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FromArg {
    Html,
    Md,
}

impl From<FromArg> for DocumentFormat {
    fn from(v: FromArg) -> Self {
        match v {
            FromArg::Html => DocumentFormat::Html,
            FromArg::Md => DocumentFormat::Markdown,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.stdin;
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

    let options = build_options(&cli);

    // ── Single document on stdin ─────────────────────────────────────────
    if cli.stdin {
        let format: DocumentFormat = cli
            .from
            .context("--stdin requires --from html|md")?
            .into();
        return convert_stdin(format, &options);
    }

    // ── Batch ────────────────────────────────────────────────────────────
    let files = expand_inputs(&cli.inputs, cli.recursive)?;
    if files.is_empty() {
        anyhow::bail!("No convertible files found (looked for .html, .htm, .md, .markdown)");
    }

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, options, progress_cb)?;

    let control = Arc::new(BatchControl::new());
    {
        let control = Arc::clone(&control);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("{} Cancelling: running files finish, the rest are skipped", cyan("⚠"));
                control.cancel();
            }
        });
    }

    let output = batch_convert(files, &config, control).await;
    report(&cli, &output, show_progress)?;

    if output.stats.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

/// Map CLI args to `ConversionOptions`.
fn build_options(cli: &Cli) -> ConversionOptions {
    let mut builder = ConversionOptions::builder()
        .rewrite_paths(cli.rewrite_paths)
        .drop_unknown_tags(cli.drop_unknown_tags);
    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url.clone());
    }
    if let Some(ref dir) = cli.base_dir {
        builder = builder.base_dir(dir.clone());
    }
    if let Some(ref path) = cli.allowlist {
        builder = builder.tags(TagPolicy::from_file_or_default(path));
    }
    builder.build()
}

/// Map CLI args to `BatchConfig`.
fn build_config(
    cli: &Cli,
    options: ConversionOptions,
    progress: Option<ProgressCallback>,
) -> Result<BatchConfig> {
    let mut builder = BatchConfig::builder()
        .target(cli.to.into())
        .workers(cli.workers)
        .options(options);

    if let Some(ref dir) = cli.output_dir {
        builder = builder.output_dir(dir.clone());
    }
    if let Some(ref dir) = cli.base_dir {
        builder = builder.base_dir(dir.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Files are taken as given; directories are listed.
fn expand_inputs(inputs: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let found = collect_files(input, INPUT_EXTENSIONS, recursive)
                .with_context(|| format!("Failed to list {}", input.display()))?;
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

fn convert_stdin(format: DocumentFormat, options: &ConversionOptions) -> Result<()> {
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read stdin as UTF-8")?;

    let converted = Document::new(text, format).convert(options);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(converted.as_bytes())
        .context("Failed to write to stdout")?;
    if !converted.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}

fn report(cli: &Cli, output: &BatchOutput, show_progress: bool) -> Result<()> {
    if cli.json {
        let json = serde_json::to_string_pretty(output).context("Failed to serialise results")?;
        println!("{json}");
        return Ok(());
    }
    if cli.quiet {
        return Ok(());
    }

    // Without the bar, per-file lines were not printed yet.
    if !show_progress {
        for result in &output.results {
            if result.success {
                eprintln!("{} {}", green("✓"), result.message);
            } else {
                eprintln!("{} {}: {}", red("✗"), display(&result.input), result.message);
            }
        }
    }

    let stats = &output.stats;
    eprintln!(
        "{}  {}/{} converted  {} failed  {} skipped  {}ms",
        if stats.failed == 0 && !stats.cancelled {
            green("✔")
        } else {
            cyan("⚠")
        },
        stats.converted,
        stats.total,
        stats.failed,
        stats.skipped,
        stats.duration_ms,
    );
    Ok(())
}

fn display(path: &Path) -> String {
    dim(&path.display().to_string())
}
