//! Directory walker implementation using walkdir.
//!
//! # Overview
//!
//! [`Walker`] enumerates every regular file below a root and records every
//! directory it descends into. The walk is single-threaded and sorted by
//! file name inside each directory, so two walks over the same tree always
//! produce the same result.
//!
//! The returned file list is ordered **shallowest first, then by path**.
//! This order decides which of several identical files is kept, so it is
//! part of the public contract:
//!
//! 1. files directly in the root come before anything nested
//! 2. among files at the same depth, the lexicographically smaller path wins
//!
//! # Exclusions
//!
//! - Directories listed in [`WalkerConfig::excluded_dirs`] are neither
//!   descended nor recorded
//! - Symbolic links are skipped unless `follow_symlinks` is set, in which
//!   case links to regular files are reported as files; links to
//!   directories are never descended
//! - Hidden entries are skipped when `skip_hidden` is set
//!
//! # Example
//!
//! ```no_run
//! use dedupe_flatten::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let root = Path::new("/data/photos");
//! let config = WalkerConfig::default().with_excluded_dir(root.join("_duplicates"));
//! let enumeration = Walker::new(root, config).enumerate();
//!
//! println!(
//!     "{} files in {} directories",
//!     enumeration.files.len(),
//!     enumeration.directories.len()
//! );
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use walkdir::{DirEntry, WalkDir};

use super::{FileEntry, ScanError, WalkerConfig};
use crate::progress::ProgressCallback;

/// Result of a full enumeration.
#[derive(Debug, Default)]
pub struct Enumeration {
    /// Regular files, shallowest first then by path
    pub files: Vec<FileEntry>,
    /// Every directory descended into, excluding the root, in walk order
    pub directories: Vec<PathBuf>,
    /// Entries that could not be read
    pub errors: Vec<ScanError>,
    /// Whether the walk stopped early because shutdown was requested
    pub interrupted: bool,
}

/// Sorted directory walker.
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for Walker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walker")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Walker {
    /// Create a new walker for the given root.
    #[must_use]
    pub fn new(root: &Path, config: WalkerConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
            shutdown_flag: None,
            progress_callback: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback; it receives one `on_progress` per file found.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.config.excluded_dirs.iter().any(|dir| dir == path)
    }

    /// Decide whether the walk should enter (or report) this entry at all.
    fn should_visit(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return true;
        }

        if self.config.skip_hidden && is_hidden(entry) {
            log::trace!("Skipping hidden entry: {}", entry.path().display());
            return false;
        }

        if entry.file_type().is_dir() && self.is_excluded(entry.path()) {
            log::debug!("Excluding directory: {}", entry.path().display());
            return false;
        }

        true
    }

    /// Walk the tree and collect files, directories and errors.
    ///
    /// Errors never stop the walk: an unreadable directory is reported and
    /// its subtree is left out.
    pub fn enumerate(&self) -> Enumeration {
        let mut enumeration = Enumeration::default();

        let walk = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| self.should_visit(entry));

        for result in walk {
            if self.is_shutdown_requested() {
                log::debug!("Walker: Shutdown requested, stopping enumeration");
                enumeration.interrupted = true;
                break;
            }

            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    enumeration.errors.push(self.handle_walkdir_error(e));
                    continue;
                }
            };

            if entry.depth() == 0 {
                continue;
            }

            let file_type = entry.file_type();

            if file_type.is_dir() {
                enumeration.directories.push(entry.path().to_path_buf());
                continue;
            }

            match self.process_entry(&entry) {
                Some(Ok(file)) => {
                    if let Some(ref callback) = self.progress_callback {
                        callback.on_progress(
                            enumeration.files.len() + 1,
                            file.path.to_string_lossy().as_ref(),
                        );
                    }
                    enumeration.files.push(file);
                }
                Some(Err(e)) => enumeration.errors.push(e),
                None => {}
            }
        }

        enumeration
            .files
            .sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.path.cmp(&b.path)));

        log::debug!(
            "Enumerated {} files and {} directories under {} ({} errors)",
            enumeration.files.len(),
            enumeration.directories.len(),
            self.root.display(),
            enumeration.errors.len()
        );

        enumeration
    }

    /// Turn a non-directory entry into a [`FileEntry`], or skip it.
    fn process_entry(&self, entry: &DirEntry) -> Option<Result<FileEntry, ScanError>> {
        let path = entry.path();
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            if !self.config.follow_symlinks {
                log::trace!("Skipping symlink: {}", path.display());
                return None;
            }

            return match std::fs::metadata(path) {
                Ok(metadata) if metadata.is_file() => Some(Ok(FileEntry {
                    path: path.to_path_buf(),
                    size: metadata.len(),
                    depth: entry.depth(),
                    is_symlink: true,
                })),
                Ok(_) => {
                    log::trace!("Skipping symlink to non-file: {}", path.display());
                    None
                }
                Err(e) => {
                    log::debug!("Skipping dangling symlink {}: {}", path.display(), e);
                    None
                }
            };
        }

        if !file_type.is_file() {
            log::trace!("Skipping special file: {}", path.display());
            return None;
        }

        match entry.metadata() {
            Ok(metadata) => Some(Ok(FileEntry::new(
                path.to_path_buf(),
                metadata.len(),
                entry.depth(),
            ))),
            Err(e) => Some(Err(self.handle_walkdir_error(e))),
        }
    }

    /// Convert a walkdir error into a [`ScanError`].
    fn handle_walkdir_error(&self, error: walkdir::Error) -> ScanError {
        use std::io::ErrorKind;

        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);

        match error.io_error().map(std::io::Error::kind) {
            Some(ErrorKind::PermissionDenied) => {
                log::warn!("Permission denied: {}", path.display());
                ScanError::PermissionDenied(path)
            }
            Some(ErrorKind::NotFound) => {
                log::debug!("Entry vanished during walk: {}", path.display());
                ScanError::NotFound(path)
            }
            _ => {
                log::warn!("Walker error for {}: {}", path.display(), error);
                let source = error
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
                ScanError::Io { path, source }
            }
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}
