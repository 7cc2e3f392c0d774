//! Removal of empty directories.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error type for directory removal.
#[derive(Debug, Error)]
pub enum DirRemoveError {
    /// Permission denied when listing or removing the directory.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DirRemoveError {
    /// Get the path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::PermissionDenied(p) | Self::Io { path: p, .. } => p,
        }
    }

    fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}

/// Remove `dir` if it has no entries at all.
///
/// Returns `Ok(true)` when removed, `Ok(false)` when the directory still has
/// entries or is already gone.
///
/// # Errors
///
/// Fails when the directory cannot be listed or removed.
pub fn remove_if_empty(dir: &Path) -> Result<bool, DirRemoveError> {
    // The listing handle must be dropped before remove_dir on Windows
    let is_empty = match fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(DirRemoveError::from_io(dir, e)),
    };

    if !is_empty {
        return Ok(false);
    }

    match fs::remove_dir(dir) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(DirRemoveError::from_io(dir, e)),
    }
}
