//! Filesystem actions module.
//!
//! This module provides the primitives the flattener mutates the tree with:
//! - Moving a file without overwriting anything
//! - Creating the quarantine directory on demand
//! - Removing directories that have no entries left
//!
//! # Relocation
//!
//! ```no_run
//! use dedupe_flatten::actions::{ensure_dir, relocate_file};
//! use std::path::Path;
//!
//! ensure_dir(Path::new("/data/_duplicates")).unwrap();
//! relocate_file(
//!     Path::new("/data/a/photo.jpg"),
//!     Path::new("/data/_duplicates/photo.jpg"),
//! )
//! .unwrap();
//! ```
//!
//! # Removal
//!
//! ```no_run
//! use dedupe_flatten::actions::remove_if_empty;
//! use std::path::Path;
//!
//! let removed = remove_if_empty(Path::new("/data/a")).unwrap();
//! println!("removed: {}", removed);
//! ```

pub mod relocate;
pub mod remove;

// Re-export commonly used types
pub use relocate::{ensure_dir, entry_exists, relocate_file, MoveError};
pub use remove::{remove_if_empty, DirRemoveError};
