//! Flattening engine.
//!
//! This module ties the scanner and the filesystem actions together:
//! - [`names`]: collision-free destination names
//! - [`classifier`]: per-run fingerprint registry (first seen vs. already seen)
//! - [`engine`]: the walk-hash-classify-move loop
//! - [`prune`]: removal of directories left empty
//! - [`report`]: the per-file outcome feed and run summary
//!
//! # Example
//!
//! ```no_run
//! use dedupe_flatten::flatten::{FlattenConfig, Flattener};
//! use std::path::Path;
//!
//! let report = Flattener::new(FlattenConfig::default())
//!     .run(Path::new("/data/photos"))
//!     .unwrap();
//! let summary = report.summary();
//! println!("{} kept, {} duplicates", summary.kept, summary.duplicates);
//! ```

pub mod classifier;
pub mod engine;
pub mod names;
pub mod prune;
pub mod report;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::actions::{DirRemoveError, MoveError};
use crate::scanner::{HashError, ScanError};

// Re-export main types
pub use classifier::{Classification, ClassifierStore};
pub use engine::{FlattenConfig, Flattener, DEFAULT_DUPLICATES_DIR};
pub use names::{
    has_separator, is_plain_name, NameResolutionExhausted, NameResolver, DEFAULT_MAX_ATTEMPTS,
};
pub use prune::{EmptyDirPruner, PruneReport};
pub use report::{Failure, FileReport, FlattenReport, Outcome, Summary};

/// A failure confined to a single file or directory.
///
/// These are collected in the report; they never abort a run.
#[derive(Debug, Error)]
pub enum ItemError {
    /// A directory could not be listed during the walk.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// The file could not be read for hashing.
    #[error(transparent)]
    Read(#[from] HashError),

    /// The file (or the quarantine folder) could not be moved or created.
    #[error(transparent)]
    Move(#[from] MoveError),

    /// No free destination name was found.
    #[error(transparent)]
    NameExhausted(#[from] NameResolutionExhausted),

    /// An empty directory could not be removed.
    #[error(transparent)]
    DirRemove(#[from] DirRemoveError),
}

impl ItemError {
    /// Stable machine-readable kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scan(_) => "scan",
            Self::Read(_) => "read",
            Self::Move(_) => "move",
            Self::NameExhausted(_) => "name-exhausted",
            Self::DirRemove(_) => "dir-remove",
        }
    }

    /// Path the error relates to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Scan(e) => e.path(),
            Self::Read(e) => e.path(),
            Self::Move(e) => e.path(),
            Self::NameExhausted(e) => &e.dir,
            Self::DirRemove(e) => e.path(),
        }
    }
}

/// Errors that stop a run before anything is touched.
#[derive(Debug, Error)]
pub enum FlattenError {
    /// The root path does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The root path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The quarantine folder name is not a single plain name.
    #[error("Invalid duplicates folder name: '{0}'")]
    InvalidDuplicatesDir(String),

    /// The duplicate suffix would leave the quarantine folder.
    #[error("Invalid duplicate suffix: '{0}' (path separators are not allowed)")]
    InvalidDuplicateSuffix(String),

    /// The root could not be resolved.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// The root as given
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
