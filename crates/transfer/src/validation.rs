use std::io;
use std::path::{Component, Path};

use crate::TransferError;

/// Validates that `path` can name a destination file.
///
/// Rejects:
/// - Empty paths
/// - Paths without a final file-name component (`/`, `..`, `dir/..`)
/// - Paths ending in a separator (`dir/`)
///
/// Relative paths are allowed; they resolve against the working directory.
pub fn validate_destination_path(path: &Path) -> Result<(), TransferError> {
    if path.as_os_str().is_empty() {
        return Err(invalid(path, "empty path"));
    }

    match path.components().next_back() {
        Some(Component::Normal(_)) => {}
        _ => return Err(invalid(path, "path does not name a file")),
    }

    // `Path::components` normalizes a trailing separator away.
    let raw = path.as_os_str().to_string_lossy();
    if raw.ends_with('/') || (cfg!(windows) && raw.ends_with('\\')) {
        return Err(invalid(path, "path ends with a separator"));
    }

    Ok(())
}

fn invalid(path: &Path, reason: &str) -> TransferError {
    TransferError::path(path, io::Error::new(io::ErrorKind::InvalidInput, reason))
}
