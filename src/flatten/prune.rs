//! Removal of directories emptied by flattening.
//!
//! Directories are processed deepest first so that a parent whose only
//! content was an empty child becomes removable within the same pass.
//! Ties at the same depth are broken in reverse lexicographic order.
//!
//! Only directories with no entries at all are removed. A directory that
//! still holds something (a skipped symlink, a file that failed to move) is
//! left in place and is not an error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::actions::{remove_if_empty, DirRemoveError};
use crate::progress::ProgressCallback;

/// Outcome of a pruning pass.
#[derive(Debug, Default)]
pub struct PruneReport {
    /// Directories that were removed, in removal order
    pub removed: Vec<PathBuf>,
    /// Directories that could not be removed
    pub failures: Vec<DirRemoveError>,
}

impl PruneReport {
    /// Number of removed directories.
    #[must_use]
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }
}

/// Removes empty directories below a root.
pub struct EmptyDirPruner {
    /// Subtrees that are never removed
    protected: Vec<PathBuf>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for EmptyDirPruner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmptyDirPruner")
            .field("protected", &self.protected)
            .finish_non_exhaustive()
    }
}

impl Default for EmptyDirPruner {
    fn default() -> Self {
        Self::new()
    }
}

impl EmptyDirPruner {
    /// Create a pruner with no protected subtrees besides the root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            protected: Vec::new(),
            progress_callback: None,
        }
    }

    /// Never remove `dir` or anything inside it.
    #[must_use]
    pub fn with_protected(mut self, dir: PathBuf) -> Self {
        self.protected.push(dir);
        self
    }

    /// Report one `on_progress` per candidate directory.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_candidate(&self, dir: &Path, root: &Path) -> bool {
        dir != root
            && dir.starts_with(root)
            && !self.protected.iter().any(|p| dir.starts_with(p))
    }

    /// Remove every empty directory in `visited`.
    ///
    /// The root, directories outside it and protected subtrees are ignored.
    pub fn prune(&self, visited: &[PathBuf], root: &Path) -> PruneReport {
        let mut candidates: Vec<&PathBuf> = visited
            .iter()
            .filter(|dir| self.is_candidate(dir, root))
            .collect();

        candidates.sort_by(|a, b| {
            b.components()
                .count()
                .cmp(&a.components().count())
                .then_with(|| b.cmp(a))
        });
        candidates.dedup();

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start("pruning", candidates.len());
        }

        let mut report = PruneReport::default();

        for (index, dir) in candidates.into_iter().enumerate() {
            if let Some(ref callback) = self.progress_callback {
                callback.on_progress(index + 1, dir.to_string_lossy().as_ref());
            }

            match remove_if_empty(dir) {
                Ok(true) => {
                    log::debug!("Removed empty directory: {}", dir.display());
                    report.removed.push(dir.clone());
                }
                Ok(false) => {
                    log::trace!("Directory not empty, kept: {}", dir.display());
                }
                Err(e) => {
                    log::warn!("Could not remove directory {}: {}", dir.display(), e);
                    report.failures.push(e);
                }
            }
        }

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end("pruning");
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_removes_nested_empty_chain_deepest_first() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("a/b/c")).unwrap();
        let visited = vec![root.join("a"), root.join("a/b"), root.join("a/b/c")];

        let report = EmptyDirPruner::new().prune(&visited, root);

        assert_eq!(
            report.removed,
            vec![root.join("a/b/c"), root.join("a/b"), root.join("a")]
        );
        assert!(report.failures.is_empty());
        assert!(!root.join("a").exists());
    }

    #[test]
    fn test_same_depth_reverse_lexicographic() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for name in ["a", "b", "c"] {
            fs::create_dir(root.join(name)).unwrap();
        }
        let visited = vec![root.join("a"), root.join("c"), root.join("b")];

        let report = EmptyDirPruner::new().prune(&visited, root);

        assert_eq!(
            report.removed,
            vec![root.join("c"), root.join("b"), root.join("a")]
        );
    }

    #[test]
    fn test_non_empty_directory_kept_without_error() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("a/empty")).unwrap();
        fs::write(root.join("a/leftover.txt"), b"x").unwrap();
        let visited = vec![root.join("a"), root.join("a/empty")];

        let report = EmptyDirPruner::new().prune(&visited, root);

        assert_eq!(report.removed, vec![root.join("a/empty")]);
        assert!(report.failures.is_empty());
        assert!(root.join("a/leftover.txt").exists());
    }

    #[test]
    fn test_never_touches_root_or_protected() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let dups = root.join("_duplicates");
        fs::create_dir_all(dups.join("inner")).unwrap();
        let visited = vec![root.to_path_buf(), dups.clone(), dups.join("inner")];

        let report = EmptyDirPruner::new()
            .with_protected(dups.clone())
            .prune(&visited, root);

        assert_eq!(report.removed_count(), 0);
        assert!(dups.join("inner").exists());
        assert!(root.exists());
    }

    #[test]
    fn test_ignores_directories_outside_root() {
        let outer = TempDir::new().unwrap();
        let root = outer.path().join("root");
        let sibling = outer.path().join("sibling");
        fs::create_dir(&root).unwrap();
        fs::create_dir(&sibling).unwrap();

        let report = EmptyDirPruner::new().prune(&[sibling.clone()], &root);

        assert_eq!(report.removed_count(), 0);
        assert!(sibling.exists());
    }
}
