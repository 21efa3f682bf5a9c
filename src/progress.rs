//! Progress-callback trait for per-file batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::BatchConfigBuilder::progress_callback`] to receive events
//! as the orchestrator works through a batch.
//!
//! # Example
//!
//! ```rust
//! use mdbridge::{BatchConfig, BatchProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_file_complete(&self, _index: usize, total: usize, file: &str) {
//!         let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{done}/{total} {file}");
//!     }
//! }
//!
//! let config = BatchConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch orchestrator as it processes each file.
///
/// Implementations must be `Send + Sync`: with more than one worker,
/// `on_file_complete` and `on_file_error` arrive in completion order and
/// `on_file_start` may interleave with them. All methods default to no-ops.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first job is dispatched.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called just before a job starts.
    ///
    /// # Arguments
    /// * `index`: 1-based position of the file in the submitted list
    /// * `total`: number of submitted files
    /// * `file` : file name of the input
    fn on_file_start(&self, index: usize, total: usize, file: &str) {
        let _ = (index, total, file);
    }

    /// Called when a job wrote its output.
    fn on_file_complete(&self, index: usize, total: usize, file: &str) {
        let _ = (index, total, file);
    }

    /// Called when a job produced a failed result.
    fn on_file_error(&self, index: usize, total: usize, file: &str, error: &str) {
        let _ = (index, total, file, error);
    }

    /// Called once after the last result has been collected.
    ///
    /// `finished` counts results (successful or not); it is lower than
    /// `total` when the batch was cancelled.
    fn on_batch_complete(&self, total: usize, finished: usize, succeeded: usize) {
        let _ = (total, finished, succeeded);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::BatchConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        finished: AtomicUsize,
    }

    impl BatchProgressCallback for TrackingCallback {
        fn on_file_start(&self, _index: usize, _total: usize, _file: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_complete(&self, _index: usize, _total: usize, _file: &str) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_error(&self, _index: usize, _total: usize, _file: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, _total: usize, finished: usize, _succeeded: usize) {
            self.finished.store(finished, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_file_start(1, 2, "a.md");
        cb.on_file_complete(1, 2, "a.md");
        cb.on_file_error(2, 2, "b.txt", "Cannot auto-detect target for: .txt");
        cb.on_batch_complete(2, 2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_file_start(1, 2, "a.md");
        tracker.on_file_complete(1, 2, "a.md");
        tracker.on_file_start(2, 2, "b.md");
        tracker.on_file_error(2, 2, "b.md", "File not found");
        tracker.on_batch_complete(2, 2, 1);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.finished.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_batch_start(10);
        cb.on_file_start(1, 10, "x.html");
    }
}
