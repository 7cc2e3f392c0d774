//! The flattening loop.
//!
//! # Overview
//!
//! [`Flattener::run`] processes a root directory in three phases:
//!
//! 1. **Walking**: enumerate all regular files and visited directories,
//!    leaving out the quarantine folder
//! 2. **Flattening**: for each file, shallowest first and then by path,
//!    compute its fingerprint and
//!    - keep it in the root if its content has not been seen yet (files
//!      already in the root stay in place, nested files are moved up,
//!      renamed on collision)
//!    - move it into the quarantine folder otherwise
//! 3. **Pruning**: remove directories that were left with no entries
//!
//! Per-file failures are recorded and the run moves on. Only an invalid root
//! is fatal.
//!
//! # Kept copy policy
//!
//! Because files are processed shallowest first, a file already in the root
//! is always preferred over a nested copy of the same content. Among copies
//! at the same depth, the one with the lexicographically smallest path wins.
//!
//! # Example
//!
//! ```no_run
//! use dedupe_flatten::flatten::{FlattenConfig, Flattener};
//! use std::path::Path;
//!
//! let config = FlattenConfig::default()
//!     .with_duplicates_dir_name("_dupes")
//!     .with_duplicate_suffix("_dup");
//!
//! let report = Flattener::new(config).run(Path::new("/data")).unwrap();
//! for file in &report.files {
//!     println!("{} -> {}", file.source.display(), file.outcome_label());
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use super::classifier::{Classification, ClassifierStore};
use super::names::{has_separator, is_plain_name, NameResolver, DEFAULT_MAX_ATTEMPTS};
use super::prune::{EmptyDirPruner, PruneReport};
use super::report::{FileReport, FlattenReport, Outcome};
use super::{FlattenError, ItemError};
use crate::actions::{ensure_dir, relocate_file};
use crate::progress::{ProgressCallback, PHASE_FLATTENING, PHASE_WALKING};
use crate::scanner::{FileEntry, Fingerprint, Hasher, Walker, WalkerConfig, DEFAULT_BUFFER_SIZE};

/// Default name of the quarantine folder.
pub const DEFAULT_DUPLICATES_DIR: &str = "_duplicates";

/// Configuration for a flattening run.
#[derive(Clone)]
pub struct FlattenConfig {
    /// Name of the quarantine folder created directly in the root
    pub duplicates_dir_name: String,
    /// Inserted after the stem of quarantined file names
    pub duplicate_suffix: String,
    /// Bound on numbered name candidates
    pub max_rename_attempts: u32,
    /// Read buffer size for hashing
    pub hash_buffer_size: usize,
    /// Treat symlinks to regular files as files
    pub follow_symlinks: bool,
    /// Skip entries whose name starts with `.`
    pub skip_hidden: bool,
    /// Checked between files; stops the run when set
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Receives phase progress and the outcome feed
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FlattenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlattenConfig")
            .field("duplicates_dir_name", &self.duplicates_dir_name)
            .field("duplicate_suffix", &self.duplicate_suffix)
            .field("max_rename_attempts", &self.max_rename_attempts)
            .field("hash_buffer_size", &self.hash_buffer_size)
            .field("follow_symlinks", &self.follow_symlinks)
            .field("skip_hidden", &self.skip_hidden)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            duplicates_dir_name: DEFAULT_DUPLICATES_DIR.to_string(),
            duplicate_suffix: String::new(),
            max_rename_attempts: DEFAULT_MAX_ATTEMPTS,
            hash_buffer_size: DEFAULT_BUFFER_SIZE,
            follow_symlinks: false,
            skip_hidden: false,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl FlattenConfig {
    /// Set the quarantine folder name.
    #[must_use]
    pub fn with_duplicates_dir_name(mut self, name: impl Into<String>) -> Self {
        self.duplicates_dir_name = name.into();
        self
    }

    /// Set the suffix for quarantined file names.
    #[must_use]
    pub fn with_duplicate_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.duplicate_suffix = suffix.into();
        self
    }

    /// Set the bound on numbered name candidates.
    #[must_use]
    pub fn with_max_rename_attempts(mut self, attempts: u32) -> Self {
        self.max_rename_attempts = attempts;
        self
    }

    /// Set the hashing read buffer size.
    #[must_use]
    pub fn with_hash_buffer_size(mut self, size: usize) -> Self {
        self.hash_buffer_size = size;
        self
    }

    /// Enable or disable following symlinks to regular files.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Enable or disable skipping hidden entries.
    #[must_use]
    pub fn with_skip_hidden(mut self, skip: bool) -> Self {
        self.skip_hidden = skip;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Check the names that end up in destination paths.
    ///
    /// # Errors
    ///
    /// Rejects a quarantine folder name that is not a single plain name and
    /// a suffix containing a path separator.
    pub fn validate(&self) -> Result<(), FlattenError> {
        if !is_plain_name(&self.duplicates_dir_name) {
            return Err(FlattenError::InvalidDuplicatesDir(
                self.duplicates_dir_name.clone(),
            ));
        }
        if has_separator(&self.duplicate_suffix) {
            return Err(FlattenError::InvalidDuplicateSuffix(
                self.duplicate_suffix.clone(),
            ));
        }
        Ok(())
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Flattens a directory tree into its root.
#[derive(Debug)]
pub struct Flattener {
    config: FlattenConfig,
}

impl Flattener {
    /// Create a new flattener.
    #[must_use]
    pub fn new(config: FlattenConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &FlattenConfig {
        &self.config
    }

    /// Flatten `root`.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid (see
    /// [`FlattenConfig::validate`]) or when `root` does not exist, is not a
    /// directory, or cannot be resolved. Everything else ends up in the
    /// returned report.
    pub fn run(&self, root: &Path) -> Result<FlattenReport, FlattenError> {
        let started_at = Utc::now();
        let start = Instant::now();

        self.config.validate()?;
        let root = validate_root(root)?;
        let duplicates_dir = root.join(&self.config.duplicates_dir_name);
        log::info!("Flattening {}", root.display());

        let callback = self.config.progress_callback.clone();

        // Phase 1: walk
        if let Some(ref cb) = callback {
            cb.on_phase_start(PHASE_WALKING, 0);
        }
        let walker_config = WalkerConfig::new(self.config.follow_symlinks, self.config.skip_hidden)
            .with_excluded_dir(duplicates_dir.clone());
        let mut walker = Walker::new(&root, walker_config);
        if let Some(ref flag) = self.config.shutdown_flag {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }
        if let Some(ref cb) = callback {
            walker = walker.with_progress_callback(Arc::clone(cb));
        }
        let enumeration = walker.enumerate();
        if let Some(ref cb) = callback {
            cb.on_phase_end(PHASE_WALKING);
        }
        log::info!(
            "Found {} files in {} directories",
            enumeration.files.len(),
            enumeration.directories.len()
        );

        // Phase 2: flatten
        let mut interrupted = enumeration.interrupted;
        let mut files = Vec::with_capacity(enumeration.files.len());

        if !interrupted {
            if let Some(ref cb) = callback {
                cb.on_phase_start(PHASE_FLATTENING, enumeration.files.len());
            }

            let mut run = RunState::new(&self.config, &root, &duplicates_dir);
            for (index, entry) in enumeration.files.iter().enumerate() {
                if self.config.is_shutdown_requested() {
                    log::warn!(
                        "Shutdown requested, stopping after {} of {} files",
                        index,
                        enumeration.files.len()
                    );
                    interrupted = true;
                    break;
                }

                if let Some(ref cb) = callback {
                    cb.on_progress(index + 1, entry.path.to_string_lossy().as_ref());
                }

                let report = run.process(entry);
                if let Some(ref cb) = callback {
                    cb.on_outcome(&report);
                }
                files.push(report);
            }

            if let Some(ref cb) = callback {
                cb.on_phase_end(PHASE_FLATTENING);
            }
        }

        // Phase 3: prune
        let prune = if interrupted {
            log::warn!("Run interrupted, skipping empty directory removal");
            PruneReport::default()
        } else {
            let mut pruner = EmptyDirPruner::new().with_protected(duplicates_dir.clone());
            if let Some(ref cb) = callback {
                pruner = pruner.with_progress_callback(Arc::clone(cb));
            }
            pruner.prune(&enumeration.directories, &root)
        };

        let report = FlattenReport {
            root,
            duplicates_dir,
            files,
            scan_errors: enumeration.errors,
            prune,
            interrupted,
            started_at,
            duration: start.elapsed(),
        };

        let summary = report.summary();
        log::info!(
            "Done in {:.2?}: {} kept ({} moved, {} in place), {} duplicates, {} failed, {} directories removed",
            report.duration,
            summary.kept,
            summary.moved,
            summary.in_place,
            summary.duplicates,
            summary.failed,
            summary.pruned
        );

        Ok(report)
    }
}

/// Check that `root` is an existing directory and return its canonical form.
fn validate_root(root: &Path) -> Result<PathBuf, FlattenError> {
    let metadata = fs::metadata(root).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => FlattenError::PathNotFound(root.to_path_buf()),
        _ => FlattenError::Io {
            path: root.to_path_buf(),
            source: e,
        },
    })?;

    if !metadata.is_dir() {
        return Err(FlattenError::NotADirectory(root.to_path_buf()));
    }

    fs::canonicalize(root).map_err(|e| FlattenError::Io {
        path: root.to_path_buf(),
        source: e,
    })
}

/// State owned by a single run.
struct RunState<'a> {
    root: &'a Path,
    duplicates_dir: &'a Path,
    duplicate_suffix: &'a str,
    duplicates_dir_ready: bool,
    registry: ClassifierStore,
    hasher: Hasher,
    /// Names in the root; the quarantine folder name is reserved
    root_resolver: NameResolver,
    resolver: NameResolver,
}

impl<'a> RunState<'a> {
    fn new(config: &'a FlattenConfig, root: &'a Path, duplicates_dir: &'a Path) -> Self {
        Self {
            root,
            duplicates_dir,
            duplicate_suffix: &config.duplicate_suffix,
            duplicates_dir_ready: false,
            registry: ClassifierStore::new(),
            hasher: Hasher::new().with_buffer_size(config.hash_buffer_size),
            root_resolver: NameResolver::new(config.max_rename_attempts)
                .with_reserved(config.duplicates_dir_name.as_str()),
            resolver: NameResolver::new(config.max_rename_attempts),
        }
    }

    fn process(&mut self, entry: &FileEntry) -> FileReport {
        let fingerprint = match self.hasher.fingerprint(&entry.path) {
            Ok(fp) => fp,
            Err(e) => return failed(entry, None, e.into()),
        };

        match self.registry.classify(&fingerprint) {
            Classification::FirstSeen => self.keep(entry, fingerprint),
            Classification::AlreadySeen(original) => {
                self.quarantine(entry, fingerprint, original)
            }
        }
    }

    fn keep(&mut self, entry: &FileEntry, fingerprint: Fingerprint) -> FileReport {
        if entry.path.parent() == Some(self.root) {
            self.registry.record(fingerprint, entry.path.clone());
            log::trace!("Kept in place: {}", entry.path.display());
            return done(
                entry,
                fingerprint,
                Outcome::Kept {
                    destination: entry.path.clone(),
                    moved: false,
                },
            );
        }

        let result = self.move_into(entry, self.root, "");
        match result {
            Ok(destination) => {
                self.registry.record(fingerprint, destination.clone());
                done(
                    entry,
                    fingerprint,
                    Outcome::Kept {
                        destination,
                        moved: true,
                    },
                )
            }
            Err(e) => {
                // Later copies of this content must still count as duplicates
                self.registry.record(fingerprint, entry.path.clone());
                failed(entry, Some(fingerprint), e)
            }
        }
    }

    fn quarantine(
        &mut self,
        entry: &FileEntry,
        fingerprint: Fingerprint,
        original: PathBuf,
    ) -> FileReport {
        if !self.duplicates_dir_ready {
            if let Err(e) = ensure_dir(self.duplicates_dir) {
                return failed(entry, Some(fingerprint), e.into());
            }
            self.duplicates_dir_ready = true;
        }

        match self.move_into(entry, self.duplicates_dir, self.duplicate_suffix) {
            Ok(destination) => done(
                entry,
                fingerprint,
                Outcome::Duplicate {
                    destination,
                    original,
                },
            ),
            Err(e) => failed(entry, Some(fingerprint), e),
        }
    }

    /// Resolve a free name in `dir` and move the file there.
    fn move_into(&self, entry: &FileEntry, dir: &Path, suffix: &str) -> Result<PathBuf, ItemError> {
        let Some(name) = entry.path.file_name() else {
            return Err(crate::actions::MoveError::NotFound(entry.path.clone()).into());
        };

        let resolver = if dir == self.root {
            &self.root_resolver
        } else {
            &self.resolver
        };
        let destination = resolver.resolve_with_suffix(dir, name, suffix)?;
        relocate_file(&entry.path, &destination)?;

        log::debug!(
            "Moved {} -> {}",
            entry.path.display(),
            destination.display()
        );
        Ok(destination)
    }
}

fn done(entry: &FileEntry, fingerprint: Fingerprint, outcome: Outcome) -> FileReport {
    FileReport {
        source: entry.path.clone(),
        size: entry.size,
        fingerprint: Some(fingerprint),
        outcome,
    }
}

fn failed(entry: &FileEntry, fingerprint: Option<Fingerprint>, error: ItemError) -> FileReport {
    log::warn!("Failed to process {}: {}", entry.path.display(), error);
    FileReport {
        source: entry.path.clone(),
        size: entry.size,
        fingerprint,
        outcome: Outcome::Failed(error),
    }
}
