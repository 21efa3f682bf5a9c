//! Error types for the mdbridge library.
//!
//! Failures are split by how far they are allowed to travel:
//!
//! * [`ConvertError`]: a single-document conversion hit a structural
//!   problem. The `try_*` entry points return it; the total entry points
//!   ([`crate::html_to_markdown`], [`crate::markdown_to_html`]) log it and
//!   fall back to a best-effort string instead.
//!
//! * [`JobError`]: **Non-fatal**: one file in a batch failed (missing,
//!   unreadable, unknown extension, unwritable output). It is rendered into
//!   a failed [`crate::output::ConversionResult`] and the batch carries on.
//!
//! * [`PolicyError`]: the tag allow-list payload could not be read or
//!   parsed. Callers fall back to the default allow-lists.
//!
//! * [`MdBridgeError`]: **Fatal** for the call that returns it: invalid
//!   builder configuration, runtime creation, directory listing.

use std::path::PathBuf;
use thiserror::Error;

/// A recoverable failure inside one of the single-document converters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConvertError {
    /// The HTML event stream could not be mapped onto Markdown structure.
    #[error("HTML parse error: {0}")]
    Parse(String),

    /// A Markdown renderer stage produced inconsistent output.
    #[error("Markdown render error: {0}")]
    Render(String),

    /// The converter panicked; the payload message is kept when available.
    #[error("Converter panicked: {0}")]
    Panicked(String),
}

/// A non-fatal error for a single conversion job.
#[derive(Debug, Error)]
pub enum JobError {
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// Any other read failure.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid UTF-8.
    #[error("'{path}' is not valid UTF-8 (invalid byte at offset {offset})")]
    InvalidEncoding { path: PathBuf, offset: usize },

    /// `auto` target could not be inferred from the file extension.
    #[error("Cannot auto-detect target for: {extension}")]
    UndetectableFormat { extension: String },

    /// A target format string that is none of `auto`, `md`, `html`.
    #[error("Unsupported target format: {format}")]
    UnsupportedFormat { format: String },

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The blocking worker running the job did not complete.
    #[error("Conversion task failed: {0}")]
    TaskFailed(String),
}

/// Errors loading a tag allow-list.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Failed to read allow-list '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed allow-list payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// All fatal errors returned by the mdbridge library.
#[derive(Debug, Error)]
pub enum MdBridgeError {
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The tokio runtime backing a blocking wrapper could not be created.
    #[error("Failed to create tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// Listing input files failed.
    #[error("Failed to list '{path}': {reason}")]
    Listing { path: PathBuf, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undetectable_format_display() {
        let e = JobError::UndetectableFormat {
            extension: ".txt".into(),
        };
        assert_eq!(e.to_string(), "Cannot auto-detect target for: .txt");
    }

    #[test]
    fn unsupported_format_display() {
        let e = JobError::UnsupportedFormat {
            format: "pdf".into(),
        };
        assert!(e.to_string().contains("pdf"), "got: {e}");
    }

    #[test]
    fn invalid_encoding_display() {
        let e = JobError::InvalidEncoding {
            path: PathBuf::from("a.html"),
            offset: 7,
        };
        let msg = e.to_string();
        assert!(msg.contains("a.html"));
        assert!(msg.contains("offset 7"));
    }

    #[test]
    fn policy_error_from_json() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e: PolicyError = err.into();
        assert!(e.to_string().starts_with("Malformed allow-list payload"));
    }
}
