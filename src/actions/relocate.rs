//! Moving files without ever overwriting.
//!
//! # Overview
//!
//! [`relocate_file`] moves a single file to a destination path:
//! - The destination must not exist; an existing entry of any kind
//!   (including a dangling symlink) is refused with
//!   [`MoveError::DestinationExists`]
//! - A plain rename is tried first
//! - When source and destination live on different filesystems the file is
//!   copied, flushed to disk and the source removed afterwards
//!
//! [`ensure_dir`] creates a directory (the quarantine folder) on demand.
//!
//! # Example
//!
//! ```no_run
//! use dedupe_flatten::actions::relocate_file;
//! use std::path::Path;
//!
//! match relocate_file(Path::new("/data/a/photo.jpg"), Path::new("/data/photo.jpg")) {
//!     Ok(()) => println!("moved"),
//!     Err(e) => eprintln!("Failed: {}", e),
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error type for move and directory creation operations.
#[derive(Debug, Error)]
pub enum MoveError {
    /// Source file was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied on the source or the destination directory.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The destination is already taken; nothing was moved.
    #[error("destination already exists: {0}")]
    DestinationExists(PathBuf),

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl MoveError {
    /// Get the path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::DestinationExists(p)
            | Self::Io { path: p, .. } => p,
        }
    }

    fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::AlreadyExists => Self::DestinationExists(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}

/// Check whether any directory entry occupies `path`.
///
/// Symlinks are not followed, so a dangling link counts as taken. Any error
/// other than "not found" is treated as taken as well.
#[must_use]
pub fn entry_exists(path: &Path) -> bool {
    match fs::symlink_metadata(path) {
        Ok(_) => true,
        Err(e) => e.kind() != io::ErrorKind::NotFound,
    }
}

/// Move `src` to `dest`, refusing to replace an existing entry.
///
/// # Errors
///
/// - `DestinationExists` if `dest` is taken
/// - `NotFound` if `src` is gone
/// - `PermissionDenied` if the rename or copy is not allowed
/// - `Io` for anything else, including a missing destination directory
///   (reported against `dest`) and a failed cross-device copy (the copy is
///   removed and the source left untouched)
pub fn relocate_file(src: &Path, dest: &Path) -> Result<(), MoveError> {
    if entry_exists(dest) {
        return Err(MoveError::DestinationExists(dest.to_path_buf()));
    }

    match fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(err) if is_cross_device_error(&err) => {
            log::debug!(
                "Cross-device move, copying {} -> {}",
                src.display(),
                dest.display()
            );
            copy_then_remove(src, dest)
        }
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            Err(MoveError::DestinationExists(dest.to_path_buf()))
        }
        Err(err) => Err(move_failure(src, dest, err)),
    }
}

/// Attribute a failed move to the side that caused it. "Not found" with the
/// source still present means the destination directory is missing.
fn move_failure(src: &Path, dest: &Path, err: io::Error) -> MoveError {
    if err.kind() == io::ErrorKind::NotFound && fs::symlink_metadata(src).is_ok() {
        return MoveError::Io {
            path: dest.to_path_buf(),
            source: err,
        };
    }
    MoveError::from_io(src, err)
}

/// Copy, sync, then remove the source. On any failure `dest` is removed
/// again, so the content exists exactly once afterwards.
fn copy_then_remove(src: &Path, dest: &Path) -> Result<(), MoveError> {
    if let Err(copy_err) = fs::copy(src, dest) {
        let _ = fs::remove_file(dest);
        return Err(move_failure(src, dest, copy_err));
    }

    let synced = fs::File::open(dest).and_then(|file| file.sync_all());
    if let Err(e) = synced {
        let _ = fs::remove_file(dest);
        return Err(MoveError::from_io(dest, e));
    }

    remove_source(src, dest)
}

fn remove_source(src: &Path, dest: &Path) -> Result<(), MoveError> {
    match fs::remove_file(src) {
        Ok(()) => Ok(()),
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(dest) {
                log::warn!(
                    "Could not remove copy {} after failing to remove {}: {}",
                    dest.display(),
                    src.display(),
                    cleanup
                );
            }
            Err(MoveError::from_io(src, e))
        }
    }
}

fn is_cross_device_error(err: &io::Error) -> bool {
    match err.raw_os_error() {
        Some(18) => true, // POSIX EXDEV
        Some(17) if cfg!(windows) => true, // Windows ERROR_NOT_SAME_DEVICE
        _ => false,
    }
}

/// Create `dir` if it does not exist yet.
///
/// Returns `true` when the directory was created by this call.
///
/// # Errors
///
/// Fails if `dir` exists but is not a directory, or cannot be created.
pub fn ensure_dir(dir: &Path) -> Result<bool, MoveError> {
    match fs::symlink_metadata(dir) {
        Ok(metadata) if metadata.is_dir() => return Ok(false),
        Ok(_) => return Err(MoveError::DestinationExists(dir.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(MoveError::from_io(dir, e)),
    }

    match fs::create_dir(dir) {
        Ok(()) => {
            log::info!("Created directory: {}", dir.display());
            Ok(true)
        }
        Err(e) => Err(MoveError::from_io(dir, e)),
    }
}
