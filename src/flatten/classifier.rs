//! Per-run registry of kept content.
//!
//! [`ClassifierStore`] maps each content fingerprint to the path of the copy
//! that was kept for it. It answers one question for the flattener: has this
//! content been seen before in the current run?
//!
//! The store never registers anything on its own; the caller records a
//! fingerprint once it knows where the kept copy ended up.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::scanner::{hash_to_hex, Fingerprint};

/// Result of classifying a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// No kept copy exists for this content yet.
    FirstSeen,
    /// The content is already kept at the given path.
    AlreadySeen(PathBuf),
}

/// In-memory fingerprint to kept-path registry.
#[derive(Debug, Default)]
pub struct ClassifierStore {
    kept: HashMap<Fingerprint, PathBuf>,
}

impl ClassifierStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a fingerprint against the content recorded so far.
    #[must_use]
    pub fn classify(&self, fingerprint: &Fingerprint) -> Classification {
        match self.kept.get(fingerprint) {
            Some(path) => Classification::AlreadySeen(path.clone()),
            None => Classification::FirstSeen,
        }
    }

    /// Record where the kept copy of `fingerprint` lives.
    ///
    /// Recording an already known fingerprint replaces its path and returns
    /// the previous one.
    pub fn record(&mut self, fingerprint: Fingerprint, path: PathBuf) -> Option<PathBuf> {
        let previous = self.kept.insert(fingerprint, path);
        if let Some(ref old) = previous {
            log::warn!(
                "Kept path for {} replaced (was {})",
                hash_to_hex(&fingerprint),
                old.display()
            );
        }
        previous
    }

    /// Kept path for a fingerprint, if any.
    #[must_use]
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<&Path> {
        self.kept.get(fingerprint).map(PathBuf::as_path)
    }

    /// Number of distinct contents recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.kept.len()
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_seen_until_recorded() {
        let mut store = ClassifierStore::new();
        let fp = [7u8; 32];

        assert_eq!(store.classify(&fp), Classification::FirstSeen);
        // Classification alone does not register
        assert_eq!(store.classify(&fp), Classification::FirstSeen);
        assert!(store.is_empty());

        assert_eq!(store.record(fp, PathBuf::from("/r/a.txt")), None);
        assert_eq!(
            store.classify(&fp),
            Classification::AlreadySeen(PathBuf::from("/r/a.txt"))
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_distinct_fingerprints_are_independent() {
        let mut store = ClassifierStore::new();
        store.record([1u8; 32], PathBuf::from("/r/one"));

        assert_eq!(store.classify(&[2u8; 32]), Classification::FirstSeen);
        assert_eq!(store.get(&[1u8; 32]), Some(Path::new("/r/one")));
        assert_eq!(store.get(&[2u8; 32]), None);
    }

    #[test]
    fn test_record_twice_overwrites_and_returns_previous() {
        let mut store = ClassifierStore::new();
        let fp = [3u8; 32];

        store.record(fp, PathBuf::from("/r/first"));
        let previous = store.record(fp, PathBuf::from("/r/second"));

        assert_eq!(previous, Some(PathBuf::from("/r/first")));
        assert_eq!(store.get(&fp), Some(Path::new("/r/second")));
        assert_eq!(store.len(), 1);
    }
}
