//! Output formatters for flatten reports.
//!
//! This module provides different output formats for a finished run:
//! - Text for people (colored summary and failure list)
//! - JSON for automation and scripting
//! - CSV for spreadsheet import (one row per file)
//!
//! # Example
//!
//! ```no_run
//! use dedupe_flatten::error::ExitCode;
//! use dedupe_flatten::flatten::{FlattenConfig, Flattener};
//! use dedupe_flatten::output::JsonOutput;
//! use std::path::Path;
//!
//! let report = Flattener::new(FlattenConfig::default())
//!     .run(Path::new("."))
//!     .unwrap();
//! let output = JsonOutput::new(&report, ExitCode::from_report(&report));
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

pub mod csv;
pub mod json;
pub mod text;

// Re-export main types
pub use csv::{CsvOutput, CsvOutputError};
pub use json::{JsonOutput, JsonOutputError};
pub use text::TextOutput;
