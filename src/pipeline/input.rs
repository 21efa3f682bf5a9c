//! Input loading: read a job's file as UTF-8 text.
//!
//! Every failure is mapped to a [`JobError`] variant so the batch can turn
//! it into a failed result instead of stopping.

use crate::error::JobError;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Read `path` as UTF-8.
pub fn read_document(path: &Path) -> Result<String, JobError> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => JobError::FileNotFound {
            path: path.to_path_buf(),
        },
        ErrorKind::PermissionDenied => JobError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => JobError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let text = String::from_utf8(bytes).map_err(|e| JobError::InvalidEncoding {
        path: path.to_path_buf(),
        offset: e.utf8_error().valid_up_to(),
    })?;

    debug!("Read {} bytes from {}", text.len(), path.display());
    Ok(strip_bom(text))
}

fn strip_bom(text: String) -> String {
    match text.strip_prefix('\u{FEFF}') {
        Some(rest) => rest.to_string(),
        None => text,
    }
}
