//! Progress reporting utilities using indicatif.
//!
//! This module provides the [`Progress`] struct which implements [`ProgressCallback`]
//! to display progress in the terminal while a tree is being flattened.
//!
//! A run goes through three phases, each announced with
//! [`ProgressCallback::on_phase_start`]:
//!
//! | phase        | display                                   |
//! |--------------|-------------------------------------------|
//! | `walking`    | spinner with the number of files found    |
//! | `flattening` | bar over all files, with duplicate count  |
//! | `pruning`    | bar over the visited directories          |
//!
//! Every processed file is also pushed through
//! [`ProgressCallback::on_outcome`], which is the outcome feed consumers can
//! hook into without waiting for the final report.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::flatten::{FileReport, Outcome};

/// Phase name for directory enumeration.
pub const PHASE_WALKING: &str = "walking";
/// Phase name for the per-file hash/classify/move loop.
pub const PHASE_FLATTENING: &str = "flattening";
/// Phase name for empty directory removal.
pub const PHASE_PRUNING: &str = "pruning";

/// Progress callback for the flattening phases.
///
/// Implement this trait to receive progress updates and the per-file
/// outcome feed during a run.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase (`walking`, `flattening`, `pruning`)
    /// * `total` - Total number of items to process (0 when unknown)
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called for each item processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Current item number (1-based)
    /// * `path` - Path being processed
    fn on_progress(&self, current: usize, path: &str);

    /// Called once per file as soon as its outcome is known.
    fn on_outcome(&self, _report: &FileReport) {}

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called to update the progress message.
    fn on_message(&self, _message: &str) {}
}

/// Progress reporter using indicatif.
pub struct Progress {
    multi: MultiProgress,
    active: Mutex<Option<ProgressBar>>,
    duplicates: AtomicUsize,
    failures: AtomicUsize,
    quiet: bool,
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("quiet", &self.quiet)
            .field("duplicates", &self.duplicates.load(Ordering::Relaxed))
            .field("failures", &self.failures.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use dedupe_flatten::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            active: Mutex::new(None),
            duplicates: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
            quiet,
        }
    }

    /// Duplicates seen so far through the outcome feed.
    #[must_use]
    pub fn duplicates_seen(&self) -> usize {
        self.duplicates.load(Ordering::Relaxed)
    }

    /// Failures seen so far through the outcome feed.
    #[must_use]
    pub fn failures_seen(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    fn walking_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn with_active(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.active.lock() {
            if let Some(ref pb) = *guard {
                f(pb);
            }
        }
    }

    fn replace_active(&self, pb: Option<ProgressBar>) -> Option<ProgressBar> {
        match self.active.lock() {
            Ok(mut guard) => std::mem::replace(&mut *guard, pb),
            Err(_) => None,
        }
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        let pb = match phase {
            PHASE_WALKING => {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(Self::walking_style());
                pb.set_message("Walking directory");
                pb.enable_steady_tick(Duration::from_millis(100));
                pb
            }
            PHASE_FLATTENING => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(Self::bar_style());
                pb.set_message("Flattening");
                pb
            }
            _ => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(Self::bar_style());
                pb.set_message(phase.to_string());
                pb
            }
        };

        if let Some(previous) = self.replace_active(Some(pb)) {
            previous.finish_and_clear();
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }

        let duplicates = self.duplicates_seen();
        self.with_active(|pb| {
            pb.set_position(current as u64);
            if duplicates > 0 {
                pb.set_message(format!("{} dup | {}", duplicates, truncate_path(path, 30)));
            } else {
                pb.set_message(truncate_path(path, 30));
            }
        });
    }

    fn on_outcome(&self, report: &FileReport) {
        match report.outcome {
            Outcome::Duplicate { .. } => {
                self.duplicates.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Failed(_) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Kept { .. } => {}
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }

        if let Some(pb) = self.replace_active(None) {
            let message = match phase {
                PHASE_WALKING => "Walking complete".to_string(),
                PHASE_FLATTENING => format!(
                    "Flattening complete ({} duplicates, {} failed)",
                    self.duplicates_seen(),
                    self.failures_seen()
                ),
                PHASE_PRUNING => "Pruning complete".to_string(),
                other => format!("{other} complete"),
            };
            pb.finish_with_message(message);
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }

        self.with_active(|pb| pb.set_message(message.to_string()));
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len >= max_len {
        let tail: String = file_name.chars().skip(name_len + 3 - max_len).collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}
