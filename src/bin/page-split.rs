//! CLI binary for page-splitter.
//!
//! A thin shim over the library crate that maps CLI flags to `SplitConfig`,
//! opens the buckets involved and prints the uploaded pages.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use page_splitter::{
    BucketStore, DocumentSplitter, ObjectLocator, PageResult, ProgressCallback, SplitConfig,
    SplitProgressCallback,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
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

/// Live progress bar with one log line per uploaded page.
struct CliProgressCallback {
    bar: ProgressBar,
    started: Instant,
}

impl CliProgressCallback {
    /// Spinner until the page count is known.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Decoding source…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Instant::now(),
        })
    }

    /// Clear the bar when the job fails, so the error is printed on a clean line.
    fn abandon(&self) {
        self.bar.finish_and_clear();
    }
}

impl SplitProgressCallback for CliProgressCallback {
    fn on_split_start(&self, total_pages: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Uploading");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Splitting into {total_pages} pages…"))
        ));
    }

    fn on_page_uploaded(&self, page_number: usize, total_pages: usize, location: &ObjectLocator) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_number,
            total_pages,
            dim(&location.to_string()),
        ));
        self.bar.inc(1);
    }

    fn on_split_complete(&self, total_pages: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} pages uploaded in {:.1}s",
            green("✔"),
            bold(&total_pages.to_string()),
            self.started.elapsed().as_secs_f64()
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Split a PDF from S3 into per-page images in another bucket
  page-split s3://incoming/input/report.pdf --output-bucket pages --job-id job-42

  # Standalone image: uploaded unchanged as page 0
  page-split s3://incoming/scans/photo.jpg --output-bucket pages

  # Work against local directories instead of S3 (./data/<bucket>/<key>)
  page-split incoming/input/report.pdf --output-bucket pages --local-root ./data

  # JSON output
  page-split s3://incoming/input/report.pdf --output-bucket pages --json

OUTPUT LAYOUT:
  {prefix}/{job_id}/metadata.json
  {prefix}/{job_id}/pages/images/{page}.{ext}

ENVIRONMENT VARIABLES:
  AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, AWS_REGION, AWS_ENDPOINT
                          S3 credentials and endpoint
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Overrides the log filter
"#;

/// Split PDFs and images in object storage into one image per page.
#[derive(Parser, Debug)]
#[command(
    name = "page-split",
    version,
    about = "Split PDFs and images in object storage into one image per page",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Source object: s3://bucket/key or bucket/key.
    source: ObjectLocator,

    /// Bucket that receives the metadata record and page images.
    #[arg(long, env = "PAGE_SPLIT_OUTPUT_BUCKET")]
    output_bucket: String,

    /// Job id; a random UUID is used when omitted.
    #[arg(long, env = "PAGE_SPLIT_JOB_ID")]
    job_id: Option<String>,

    /// First path component of every output key.
    #[arg(long, env = "PAGE_SPLIT_PREFIX")]
    prefix: Option<String>,

    /// Zoom factor for rasterised pages (0.1–10).
    #[arg(long, env = "PAGE_SPLIT_SCALE")]
    scale: Option<f32>,

    /// Pages rasterised before they are uploaded.
    #[arg(long, env = "PAGE_SPLIT_BATCH_PAGES")]
    batch_pages: Option<usize>,

    /// Treat each bucket as the directory <DIR>/<bucket> instead of S3.
    #[arg(long, env = "PAGE_SPLIT_LOCAL_ROOT")]
    local_root: Option<PathBuf>,

    /// Path to libpdfium (file or directory containing it).
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Print the page results as JSON.
    #[arg(long, env = "PAGE_SPLIT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PAGE_SPLIT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PAGE_SPLIT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PAGE_SPLIT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless -v is given.
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

    // ── Storage ──────────────────────────────────────────────────────────
    let mut buckets = vec![cli.source.bucket.clone()];
    if cli.output_bucket != cli.source.bucket {
        buckets.push(cli.output_bucket.clone());
    }
    let storage = match cli.local_root {
        Some(ref root) => BucketStore::local(root, &buckets)
            .with_context(|| format!("Failed to open local buckets under {}", root.display()))?,
        None => BucketStore::s3_from_env(&buckets).context("Failed to configure S3 buckets")?,
    };

    // ── Run split ────────────────────────────────────────────────────────
    let cli_progress = show_progress.then(CliProgressCallback::new_dynamic);
    let progress_cb = cli_progress
        .clone()
        .map(|cb| cb as Arc<dyn SplitProgressCallback>);
    let job_id = cli
        .job_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let outcome = run_split(&cli, storage, progress_cb, &job_id).await;
    if let (Err(_), Some(progress)) = (&outcome, &cli_progress) {
        progress.abandon();
    }
    let (pages, metadata_location) = outcome?;

    if cli.json {
        let json = serde_json::to_string_pretty(&pages).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        print_pages(&job_id, &metadata_location, &pages);
    }

    Ok(())
}

/// Open the source and split it; returns the page results and the metadata location.
async fn run_split(
    cli: &Cli,
    storage: BucketStore,
    progress: Option<ProgressCallback>,
    job_id: &str,
) -> Result<(Vec<PageResult>, ObjectLocator)> {
    let config = build_config(cli, progress)?;
    let mut splitter = DocumentSplitter::open(
        Arc::new(storage),
        cli.source.clone(),
        Some(job_id.to_string()),
        cli.output_bucket.clone(),
        config,
    )
    .await
    .with_context(|| format!("Failed to open {}", cli.source))?;

    let pages = splitter
        .split_upload_pages(None)
        .await
        .with_context(|| format!("Failed to split {}", cli.source))?;
    Ok((pages, splitter.metadata_location()))
}

/// Map CLI args to `SplitConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<SplitConfig> {
    let mut builder = SplitConfig::builder();
    if let Some(ref prefix) = cli.prefix {
        builder = builder.output_prefix(prefix.clone());
    }
    if let Some(scale) = cli.scale {
        builder = builder.render_scale(scale);
    }
    if let Some(pages) = cli.batch_pages {
        builder = builder.render_batch_pages(pages);
    }
    if let Some(ref path) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(path.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    builder.build().context("Invalid configuration")
}

fn print_pages(job_id: &str, metadata: &ObjectLocator, pages: &[PageResult]) {
    println!("Job:       {}", job_id);
    println!("Metadata:  {}", metadata);
    for page in pages {
        println!(
            "{:>4}  {:<10}  {:>5}x{:<5}  {}",
            page.page_number,
            format!("{:?}", page.origin).to_lowercase(),
            page.width(),
            page.height(),
            page.location
        );
    }
}
