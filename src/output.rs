//! Result types produced by file and batch conversion.

use crate::config::DocumentFormat;
use crate::error::JobError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Outcome of one conversion job. Produced exactly once per job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Whether the output file was written.
    pub success: bool,
    /// Human-readable summary ("Saved to …" or the error message).
    pub message: String,
    /// The input file.
    pub input: PathBuf,
    /// The written output file, on success.
    pub output: Option<PathBuf>,
    /// The format that was produced, once it is known.
    pub target: Option<DocumentFormat>,
    /// Bytes written to `output`.
    pub bytes_written: usize,
    /// Wall-clock time spent on the job.
    pub duration_ms: u64,
}

impl ConversionResult {
    pub(crate) fn saved(
        input: &Path,
        output: PathBuf,
        target: DocumentFormat,
        bytes_written: usize,
        duration_ms: u64,
    ) -> Self {
        Self {
            success: true,
            message: format!("Saved to {}", output.display()),
            input: input.to_path_buf(),
            output: Some(output),
            target: Some(target),
            bytes_written,
            duration_ms,
        }
    }

    pub(crate) fn failed(
        input: &Path,
        target: Option<DocumentFormat>,
        error: &JobError,
        duration_ms: u64,
    ) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            input: input.to_path_buf(),
            output: None,
            target,
            bytes_written: 0,
            duration_ms,
        }
    }

    /// File name of the input, for progress displays.
    pub fn file_name(&self) -> String {
        display_name(&self.input)
    }
}

/// Aggregate statistics for a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Files submitted.
    pub total: usize,
    /// Jobs that wrote their output.
    pub converted: usize,
    /// Jobs that produced a failed result.
    pub failed: usize,
    /// Files never started because the batch was cancelled.
    pub skipped: usize,
    /// Whether cancellation was observed.
    pub cancelled: bool,
    /// Wall-clock time for the whole batch.
    pub duration_ms: u64,
}

/// Everything a batch returns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchOutput {
    /// One entry per started job. Completion order when `workers > 1`,
    /// submission order otherwise.
    pub results: Vec<ConversionResult>,
    pub stats: BatchStats,
}

impl BatchOutput {
    /// Failed results only.
    pub fn failures(&self) -> impl Iterator<Item = &ConversionResult> {
        self.results.iter().filter(|r| !r.success)
    }
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
