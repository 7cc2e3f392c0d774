//! CSV output formatter for flatten reports.
//!
//! One row is generated for each processed file.
//!
//! # Columns
//!
//! - `source`: Where the file was found
//! - `outcome`: `kept`, `duplicate` or `failed`
//! - `destination`: Final location (empty for failures)
//! - `size`: File size in bytes
//! - `fingerprint`: BLAKE3 content hash (hex, empty if unreadable)
//! - `error_kind`: Failure kind (empty unless failed)
//! - `error`: Failure message (empty unless failed)

use std::io;

use serde::Serialize;
use thiserror::Error;

use crate::flatten::FlattenReport;
use crate::scanner::hash_to_hex;

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    source: String,
    outcome: &'a str,
    destination: String,
    size: u64,
    fingerprint: String,
    error_kind: &'a str,
    error: String,
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    report: &'a FlattenReport,
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(report: &'a FlattenReport) -> Self {
        Self { report }
    }

    /// Write the CSV output to the given writer.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        for file in &self.report.files {
            let row = CsvRow {
                source: file.source.to_string_lossy().into_owned(),
                outcome: file.outcome_label(),
                destination: file
                    .destination()
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                size: file.size,
                fingerprint: file
                    .fingerprint
                    .as_ref()
                    .map(hash_to_hex)
                    .unwrap_or_default(),
                error_kind: file.error().map_or("", |e| e.kind()),
                error: file.error().map(ToString::to_string).unwrap_or_default(),
            };
            csv_writer.serialize(row)?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
