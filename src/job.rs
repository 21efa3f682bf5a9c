//! Per-file conversion jobs.
//!
//! A [`ConversionJob`] is one input file plus the direction and output
//! placement decided for it. [`convert_file`] runs it end to end (read,
//! convert, write) and always produces exactly one [`ConversionResult`];
//! no failure escapes as an `Err`.

use crate::config::{ConversionOptions, DocumentFormat, OutputPolicy, TargetFormat};
use crate::convert::{html_to_markdown, markdown_to_html};
use crate::error::JobError;
use crate::output::ConversionResult;
use crate::pipeline::input;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// One file to convert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionJob {
    pub input: PathBuf,
    pub target: TargetFormat,
    pub output: OutputPolicy,
}

impl ConversionJob {
    pub fn new(input: impl Into<PathBuf>, target: TargetFormat, output: OutputPolicy) -> Self {
        Self {
            input: input.into(),
            target,
            output,
        }
    }

    /// Where the converted document is written for `format`.
    ///
    /// Same stem, swapped extension. Under [`OutputPolicy::Mapped`] the file
    /// keeps its path relative to `base_dir` when it lives below it,
    /// otherwise only its file name.
    pub fn output_path(&self, format: DocumentFormat) -> PathBuf {
        match &self.output {
            OutputPolicy::SameDirectory => self.input.with_extension(format.extension()),
            OutputPolicy::Mapped {
                output_dir,
                base_dir,
            } => {
                let relative = base_dir
                    .as_deref()
                    .and_then(|base| relative_to(&self.input, base))
                    .unwrap_or_else(|| {
                        self.input
                            .file_name()
                            .map(PathBuf::from)
                            .unwrap_or_else(|| self.input.clone())
                    });
                output_dir.join(relative).with_extension(format.extension())
            }
        }
    }

    /// Options for this job: without an explicit `base_dir`, references
    /// resolve against the input file's own directory.
    fn options(&self, shared: &ConversionOptions) -> ConversionOptions {
        let mut options = shared.clone();
        if options.base_dir.is_none() {
            let parent = self
                .input
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            options.base_dir = Some(parent.to_path_buf());
        }
        options
    }
}

fn relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    if let Ok(rel) = path.strip_prefix(base) {
        return Some(rel.to_path_buf());
    }
    let path = path.canonicalize().ok()?;
    let base = base.canonicalize().ok()?;
    path.strip_prefix(&base).ok().map(Path::to_path_buf)
}

/// Convert one file and write the result next to it (or under the mapped
/// output directory).
pub fn convert_file(job: &ConversionJob, options: &ConversionOptions) -> ConversionResult {
    let start = Instant::now();
    let elapsed = || start.elapsed().as_millis() as u64;

    let target = match job.target.resolve_for(&job.input) {
        Ok(t) => t,
        Err(e) => {
            warn!("Skipping {}: {e}", job.input.display());
            return ConversionResult::failed(&job.input, None, &e, elapsed());
        }
    };

    match run(job, target, options) {
        Ok((output, bytes)) => {
            info!("Converted {} → {}", job.input.display(), output.display());
            ConversionResult::saved(&job.input, output, target, bytes, elapsed())
        }
        Err(e) => {
            warn!("Failed to convert {}: {e}", job.input.display());
            ConversionResult::failed(&job.input, Some(target), &e, elapsed())
        }
    }
}

fn run(
    job: &ConversionJob,
    target: DocumentFormat,
    options: &ConversionOptions,
) -> Result<(PathBuf, usize), JobError> {
    let text = input::read_document(&job.input)?;
    let options = job.options(options);

    let converted = match target {
        DocumentFormat::Markdown => html_to_markdown(&text, &options),
        DocumentFormat::Html => markdown_to_html(&text, &options),
    };

    let output = job.output_path(target);
    if output == job.input {
        return Err(JobError::OutputWriteFailed {
            path: output,
            source: io::Error::new(io::ErrorKind::InvalidInput, "output would overwrite the input"),
        });
    }
    write_atomic(&output, converted.as_bytes())?;
    debug!("Wrote {} bytes to {}", converted.len(), output.display());
    Ok((output, converted.len()))
}

/// Write through a temp file in the target directory, then rename over the
/// destination, so readers never observe a partial file.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), JobError> {
    let fail = |source: io::Error| JobError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent).map_err(fail)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(fail)?;
    tmp.write_all(bytes).map_err(fail)?;
    tmp.persist(path).map_err(|e| fail(e.error))?;
    Ok(())
}
