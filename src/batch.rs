//! Batch orchestration: convert many files with bounded concurrency.
//!
//! ## Execution model
//!
//! * `workers > 1`: jobs are dispatched onto `tokio::task::spawn_blocking`
//!   through `buffer_unordered(workers)`; results arrive in completion
//!   order.
//! * `workers <= 1`: jobs run one after another in submission order.
//!
//! ## Control
//!
//! A shared [`BatchControl`] is consulted before every dispatch. Once it is
//! cancelled no new job starts, jobs already running finish, and the files
//! never started are counted as skipped. While it is paused no new job
//! starts, but running jobs complete and their results are still drained.
//! Waiting on a pause parks on a [`tokio::sync::Notify`] rather than
//! polling.

use crate::config::{BatchConfig, ConversionOptions};
use crate::error::{JobError, MdBridgeError};
use crate::job::{convert_file, ConversionJob};
use crate::output::{display_name, BatchOutput, BatchStats, ConversionResult};
use crate::policy::TagPolicy;
use crate::progress::ProgressCallback;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Notify;
use tokio_stream::Stream;
use tracing::{debug, info, warn};

/// A boxed stream of per-file results.
pub type ResultStream = Pin<Box<dyn Stream<Item = ConversionResult> + Send>>;

/// Cancellation and pause flags shared by every worker of one batch.
///
/// # Example
/// ```rust
/// use mdbridge::BatchControl;
/// use std::sync::Arc;
///
/// let control = Arc::new(BatchControl::new());
/// let handle = Arc::clone(&control);
/// handle.cancel();
/// assert!(control.is_cancelled());
/// ```
#[derive(Debug, Default)]
pub struct BatchControl {
    cancelled: AtomicBool,
    paused: AtomicBool,
    resumed: Notify,
}

impl BatchControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop dispatching new jobs. Irreversible for this batch.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.resumed.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Hold back new jobs until [`BatchControl::resume`].
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.resumed.notify_waiters();
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Return once the batch is not paused (or has been cancelled).
    pub async fn wait_while_paused(&self) {
        loop {
            // Registered before the flag check so a resume in between is not lost.
            let notified = self.resumed.notified();
            if !self.is_paused() || self.is_cancelled() {
                return;
            }
            debug!("Batch paused, waiting for resume");
            notified.await;
        }
    }

    /// Whether the next job may start, after waiting out any pause.
    async fn admit(&self) -> bool {
        self.wait_while_paused().await;
        !self.is_cancelled()
    }
}

/// Options every job of the batch shares: the batch `base_dir` replaces the
/// per-file default, and the allow-list file is loaded once here.
fn batch_options(config: &BatchConfig) -> ConversionOptions {
    let mut options = config.options.clone();
    if let Some(base) = &config.base_dir {
        options.base_dir = Some(base.clone());
    }
    if let Some(path) = &config.allowlist {
        options.tags = TagPolicy::from_file_or_default(path);
    }
    options
}

/// Convert `files`, yielding each result as soon as it is ready.
///
/// Per-file progress events fire as the stream is driven; batch start and
/// completion events are left to the caller (see [`batch_convert`]).
pub fn batch_stream(
    files: Vec<PathBuf>,
    config: &BatchConfig,
    control: Arc<BatchControl>,
) -> ResultStream {
    let total = files.len();
    let options = Arc::new(batch_options(config));
    let callback = config.progress_callback.clone();
    let policy = config.output_policy();
    let jobs: Vec<(usize, ConversionJob)> = files
        .into_iter()
        .map(|f| ConversionJob::new(f, config.target, policy.clone()))
        .enumerate()
        .collect();

    let gated = stream::iter(jobs).take_while(move |_| {
        let control = Arc::clone(&control);
        async move { control.admit().await }
    });
    let run = move |(index, job): (usize, ConversionJob)| {
        dispatch(index, total, job, Arc::clone(&options), callback.clone())
    };

    if config.workers <= 1 {
        Box::pin(gated.then(run))
    } else {
        Box::pin(gated.map(run).buffer_unordered(config.workers))
    }
}

/// Run one job on the blocking pool, reporting progress around it.
async fn dispatch(
    index: usize,
    total: usize,
    job: ConversionJob,
    options: Arc<ConversionOptions>,
    callback: Option<ProgressCallback>,
) -> ConversionResult {
    let position = index + 1;
    let name = display_name(&job.input);
    if let Some(cb) = &callback {
        cb.on_file_start(position, total, &name);
    }

    let input = job.input.clone();
    let result = match tokio::task::spawn_blocking(move || convert_file(&job, &options)).await {
        Ok(result) => result,
        Err(e) => {
            let err = JobError::TaskFailed(e.to_string());
            warn!("Job for {} did not complete: {err}", input.display());
            ConversionResult::failed(&input, None, &err, 0)
        }
    };

    if let Some(cb) = &callback {
        if result.success {
            cb.on_file_complete(position, total, &name);
        } else {
            cb.on_file_error(position, total, &name, &result.message);
        }
    }
    result
}

/// Convert a list of files.
///
/// Never fails as a whole: each file yields a [`ConversionResult`], and
/// files not started because of cancellation are counted in
/// [`BatchStats::skipped`].
///
/// # Example
/// ```rust,no_run
/// use mdbridge::{batch_convert, BatchConfig, BatchControl};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = BatchConfig::builder().workers(4).build()?;
/// let files = vec!["docs/a.html".into(), "docs/b.md".into()];
/// let output = batch_convert(files, &config, Arc::new(BatchControl::new())).await;
/// println!("{} converted, {} failed", output.stats.converted, output.stats.failed);
/// # Ok(())
/// # }
/// ```
pub async fn batch_convert(
    files: Vec<PathBuf>,
    config: &BatchConfig,
    control: Arc<BatchControl>,
) -> BatchOutput {
    let start = Instant::now();
    let total = files.len();
    info!("Starting batch: {} files, {} workers", total, config.workers.max(1));
    if let Some(cb) = &config.progress_callback {
        cb.on_batch_start(total);
    }

    let results: Vec<ConversionResult> = batch_stream(files, config, Arc::clone(&control))
        .collect()
        .await;

    let converted = results.iter().filter(|r| r.success).count();
    let stats = BatchStats {
        total,
        converted,
        failed: results.len() - converted,
        skipped: total - results.len(),
        cancelled: control.is_cancelled(),
        duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        "Batch complete: {}/{} converted, {} failed, {} skipped, {}ms",
        stats.converted, total, stats.failed, stats.skipped, stats.duration_ms
    );
    if let Some(cb) = &config.progress_callback {
        cb.on_batch_complete(total, results.len(), converted);
    }

    BatchOutput { results, stats }
}

/// Synchronous wrapper around [`batch_convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn batch_convert_blocking(
    files: Vec<PathBuf>,
    config: &BatchConfig,
    control: Arc<BatchControl>,
) -> Result<BatchOutput, MdBridgeError> {
    let runtime = tokio::runtime::Runtime::new().map_err(MdBridgeError::Runtime)?;
    Ok(runtime.block_on(batch_convert(files, config, control)))
}

/// List the files under `dir` whose extension is one of `extensions`
/// (case-insensitive, without the dot). Sorted.
pub fn collect_files(
    dir: &Path,
    extensions: &[&str],
    recursive: bool,
) -> Result<Vec<PathBuf>, MdBridgeError> {
    if !dir.is_dir() {
        return Err(MdBridgeError::Listing {
            path: dir.to_path_buf(),
            reason: "not a directory".into(),
        });
    }
    let base = glob::Pattern::escape(&dir.to_string_lossy());
    let pattern = if recursive {
        format!("{base}/**/*")
    } else {
        format!("{base}/*")
    };
    let entries = glob::glob(&pattern).map_err(|e| MdBridgeError::Listing {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() && has_extension(&path, extensions) => files.push(path),
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable entry {}: {}", e.path().display(), e.error()),
        }
    }
    files.sort();
    debug!("Collected {} files from {}", files.len(), dir.display());
    Ok(files)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(&e)))
}
