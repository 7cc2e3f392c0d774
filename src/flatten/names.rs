//! Collision-free destination names.
//!
//! # Overview
//!
//! [`NameResolver`] picks a name in a target directory that no existing
//! entry occupies. The desired name is used unchanged when free; otherwise
//! a counter is inserted between stem and extension:
//!
//! | desired        | candidates                               |
//! |----------------|------------------------------------------|
//! | `photo.jpg`    | `photo_1.jpg`, `photo_2.jpg`, ...        |
//! | `README`       | `README_1`, `README_2`, ...              |
//! | `.bashrc`      | `.bashrc_1`, `.bashrc_2`, ...            |
//! | `a.tar.gz`     | `a.tar_1.gz`, `a.tar_2.gz`, ...          |
//!
//! An optional suffix goes in front of the counter, so with `_dup` the
//! sequence for `photo.jpg` is `photo_dup.jpg`, `photo_dup_1.jpg`, ...
//!
//! Existence is checked against the filesystem on every call and never
//! cached, so the answer is only valid until the directory changes. Names
//! registered with [`NameResolver::with_reserved`] count as taken even when
//! nothing exists under them yet.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::actions::entry_exists;

/// Default bound on numbered candidates.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10_000;

/// Every candidate up to the attempt bound was taken.
#[derive(Debug, Error)]
#[error("no free name for {} in {} after {attempts} attempts", name.to_string_lossy(), dir.display())]
pub struct NameResolutionExhausted {
    /// Directory that was searched
    pub dir: PathBuf,
    /// Desired file name
    pub name: OsString,
    /// Number of numbered candidates tried
    pub attempts: u32,
}

/// Finds free file names in a directory.
#[derive(Debug, Clone)]
pub struct NameResolver {
    max_attempts: u32,
    reserved: Vec<OsString>,
}

impl Default for NameResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl NameResolver {
    /// Create a resolver that tries at most `max_attempts` numbered names.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            reserved: Vec::new(),
        }
    }

    /// Treat `name` as taken even while nothing occupies it.
    #[must_use]
    pub fn with_reserved(mut self, name: impl Into<OsString>) -> Self {
        self.reserved.push(name.into());
        self
    }

    fn is_taken(&self, path: &Path) -> bool {
        let reserved = path
            .file_name()
            .is_some_and(|name| self.reserved.iter().any(|r| r == name));
        reserved || entry_exists(path)
    }

    /// The attempt bound.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Resolve a free path for `name` inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`NameResolutionExhausted`] when every candidate is taken.
    pub fn resolve(&self, dir: &Path, name: &OsStr) -> Result<PathBuf, NameResolutionExhausted> {
        self.resolve_with_suffix(dir, name, "")
    }

    /// Resolve a free path for `name` inside `dir`, with `suffix` inserted
    /// after the stem of every candidate.
    ///
    /// # Errors
    ///
    /// Returns [`NameResolutionExhausted`] when every candidate is taken.
    pub fn resolve_with_suffix(
        &self,
        dir: &Path,
        name: &OsStr,
        suffix: &str,
    ) -> Result<PathBuf, NameResolutionExhausted> {
        let (stem, extension) = split_name(name);

        let first = dir.join(candidate(stem, suffix, None, extension));
        if !self.is_taken(&first) {
            return Ok(first);
        }

        for counter in 1..=self.max_attempts {
            let path = dir.join(candidate(stem, suffix, Some(counter), extension));
            if !self.is_taken(&path) {
                log::trace!("Resolved name collision: {}", path.display());
                return Ok(path);
            }
        }

        Err(NameResolutionExhausted {
            dir: dir.to_path_buf(),
            name: name.to_os_string(),
            attempts: self.max_attempts,
        })
    }
}

/// Whether `name` is usable as a single directory entry name.
#[must_use]
pub fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !has_separator(name)
}

/// Whether `text` contains a path separator or NUL, which would make it
/// unsafe to splice into a file name.
#[must_use]
pub fn has_separator(text: &str) -> bool {
    text.contains(['/', '\\', '\0'])
}

/// Split a file name into stem and extension.
///
/// The extension is whatever follows the last dot; a leading dot does not
/// start one. A trailing dot yields an empty extension, which is preserved.
fn split_name(name: &OsStr) -> (&OsStr, Option<&OsStr>) {
    let path = Path::new(name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), extension) => (stem, extension),
        (None, _) => (name, None),
    }
}

fn candidate(stem: &OsStr, suffix: &str, counter: Option<u32>, extension: Option<&OsStr>) -> OsString {
    let mut out = OsString::with_capacity(stem.len() + suffix.len() + 16);
    out.push(stem);
    out.push(suffix);
    if let Some(n) = counter {
        out.push(format!("_{n}"));
    }
    if let Some(ext) = extension {
        out.push(".");
        out.push(ext);
    }
    out
}
