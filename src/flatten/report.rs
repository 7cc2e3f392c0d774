//! Per-file outcomes and the run report.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::prune::PruneReport;
use super::ItemError;
use crate::scanner::{Fingerprint, ScanError};

/// What happened to a single file.
#[derive(Debug)]
pub enum Outcome {
    /// First copy of its content; now lives at `destination` in the root.
    Kept {
        /// Final location
        destination: PathBuf,
        /// False when the file was already in the root and stayed put
        moved: bool,
    },
    /// Content already kept elsewhere; moved into the quarantine folder.
    Duplicate {
        /// Location inside the quarantine folder
        destination: PathBuf,
        /// Kept copy of the same content
        original: PathBuf,
    },
    /// Processing stopped at this file; it was left where it was.
    Failed(ItemError),
}

/// One entry of the outcome feed.
#[derive(Debug)]
pub struct FileReport {
    /// Where the file was found
    pub source: PathBuf,
    /// Size in bytes at enumeration time
    pub size: u64,
    /// Content fingerprint, if hashing succeeded
    pub fingerprint: Option<Fingerprint>,
    /// What happened
    pub outcome: Outcome,
}

impl FileReport {
    /// Short outcome label: `kept`, `duplicate` or `failed`.
    #[must_use]
    pub fn outcome_label(&self) -> &'static str {
        match self.outcome {
            Outcome::Kept { .. } => "kept",
            Outcome::Duplicate { .. } => "duplicate",
            Outcome::Failed(_) => "failed",
        }
    }

    /// Final location, if the file ended up somewhere.
    #[must_use]
    pub fn destination(&self) -> Option<&Path> {
        match self.outcome {
            Outcome::Kept {
                ref destination, ..
            }
            | Outcome::Duplicate {
                ref destination, ..
            } => Some(destination),
            Outcome::Failed(_) => None,
        }
    }

    /// Whether the file was moved at all.
    #[must_use]
    pub fn is_moved(&self) -> bool {
        matches!(
            self.outcome,
            Outcome::Kept { moved: true, .. } | Outcome::Duplicate { .. }
        )
    }

    /// Whether the file was moved under a different name than it had.
    #[must_use]
    pub fn is_renamed(&self) -> bool {
        match self.destination() {
            Some(dest) if self.is_moved() => dest.file_name() != self.source.file_name(),
            _ => false,
        }
    }

    /// The error, if processing failed.
    #[must_use]
    pub fn error(&self) -> Option<&ItemError> {
        match self.outcome {
            Outcome::Failed(ref e) => Some(e),
            _ => None,
        }
    }
}

/// A failure from any stage of the run.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    /// Path the failure relates to
    pub path: PathBuf,
    /// Stable failure kind (`scan`, `read`, `move`, `name-exhausted`, `dir-remove`)
    pub kind: &'static str,
    /// Human-readable message
    #[serde(rename = "error")]
    pub message: String,
}

impl From<&ItemError> for Failure {
    fn from(error: &ItemError) -> Self {
        Self {
            path: error.path().to_path_buf(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Counts over a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Files processed
    pub files: usize,
    /// Files kept (moved or in place)
    pub kept: usize,
    /// Kept files moved into the root
    pub moved: usize,
    /// Kept files that needed a new name in the root
    pub renamed: usize,
    /// Kept files that were already in the root
    pub in_place: usize,
    /// Files moved into the quarantine folder
    pub duplicates: usize,
    /// Failures of every kind, including enumeration and pruning
    pub failed: usize,
    /// Directories removed
    pub pruned: usize,
    /// Bytes moved (kept and duplicate moves)
    pub bytes_relocated: u64,
}

/// Everything a run did.
#[derive(Debug)]
pub struct FlattenReport {
    /// Canonical root that was flattened
    pub root: PathBuf,
    /// Quarantine folder (may not exist if no duplicates were found)
    pub duplicates_dir: PathBuf,
    /// Outcome feed, in processing order
    pub files: Vec<FileReport>,
    /// Entries the walk could not read
    pub scan_errors: Vec<ScanError>,
    /// Result of the pruning pass
    pub prune: PruneReport,
    /// Whether the run stopped early on a shutdown request
    pub interrupted: bool,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// How long the run took
    pub duration: Duration,
}

impl FlattenReport {
    /// Compute summary counts.
    #[must_use]
    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            files: self.files.len(),
            pruned: self.prune.removed.len(),
            failed: self.scan_errors.len() + self.prune.failures.len(),
            ..Summary::default()
        };

        for file in &self.files {
            match file.outcome {
                Outcome::Kept { moved, .. } => {
                    summary.kept += 1;
                    if moved {
                        summary.moved += 1;
                    } else {
                        summary.in_place += 1;
                    }
                    if file.is_renamed() {
                        summary.renamed += 1;
                    }
                }
                Outcome::Duplicate { .. } => summary.duplicates += 1,
                Outcome::Failed(_) => summary.failed += 1,
            }
            if file.is_moved() {
                summary.bytes_relocated += file.size;
            }
        }

        summary
    }

    /// Every failure of the run: enumeration, per-file, then pruning.
    #[must_use]
    pub fn failures(&self) -> Vec<Failure> {
        let scan = self.scan_errors.iter().map(|e| Failure {
            path: e.path().to_path_buf(),
            kind: "scan",
            message: e.to_string(),
        });
        let items = self.files.iter().filter_map(FileReport::error).map(Failure::from);
        let prune = self.prune.failures.iter().map(|e| Failure {
            path: e.path().to_path_buf(),
            kind: "dir-remove",
            message: e.to_string(),
        });

        scan.chain(items).chain(prune).collect()
    }

    /// Whether anything failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.scan_errors.is_empty()
            || !self.prune.failures.is_empty()
            || self.files.iter().any(|f| f.error().is_some())
    }
}
