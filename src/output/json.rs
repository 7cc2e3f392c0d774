//! JSON output formatter for flatten reports.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "root": "/data",
//!   "duplicates_dir": "/data/_duplicates",
//!   "started_at": "2024-05-01T10:00:00Z",
//!   "duration_ms": 120,
//!   "interrupted": false,
//!   "exit_code": 0,
//!   "exit_code_name": "DF000",
//!   "summary": { "files": 3, "kept": 2, "moved": 2, "renamed": 0, "in_place": 0,
//!                "duplicates": 1, "failed": 0, "pruned": 3, "bytes_relocated": 3072 },
//!   "files": [
//!     { "source": "/data/A/photo.jpg", "size": 1024, "fingerprint": "ab12...",
//!       "outcome": "kept", "destination": "/data/photo.jpg" }
//!   ],
//!   "failures": [],
//!   "pruned": ["/data/A"]
//! }
//! ```

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ExitCode;
use crate::flatten::{Failure, FileReport, FlattenReport, Outcome, Summary};
use crate::scanner::hash_to_hex;

/// One processed file in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonFile {
    /// Where the file was found
    pub source: String,
    /// Size in bytes
    pub size: u64,
    /// BLAKE3 fingerprint (hex), absent if the file could not be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    /// `kept`, `duplicate` or `failed`
    pub outcome: &'static str,
    /// Final location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Kept copy, for duplicates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    /// Failure kind, for failed files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    /// Failure message, for failed files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JsonFile {
    /// Convert a file report.
    #[must_use]
    pub fn from_file_report(file: &FileReport) -> Self {
        let original = match file.outcome {
            Outcome::Duplicate { ref original, .. } => Some(path_string(original)),
            _ => None,
        };

        Self {
            source: path_string(&file.source),
            size: file.size,
            fingerprint: file.fingerprint.as_ref().map(hash_to_hex),
            outcome: file.outcome_label(),
            destination: file.destination().map(path_string),
            original,
            error_kind: file.error().map(|e| e.kind()),
            error: file.error().map(ToString::to_string),
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Flattened root
    pub root: String,
    /// Quarantine folder
    pub duplicates_dir: String,
    /// Run start time (RFC 3339)
    pub started_at: DateTime<Utc>,
    /// Run duration in milliseconds
    pub duration_ms: u64,
    /// Whether the run was interrupted
    pub interrupted: bool,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DF000")
    pub exit_code_name: String,
    /// Summary counts
    pub summary: Summary,
    /// Every processed file, in processing order
    pub files: Vec<JsonFile>,
    /// Every failure of the run
    pub failures: Vec<Failure>,
    /// Removed directories
    pub pruned: Vec<String>,
}

impl JsonOutput {
    /// Create JSON output from a report and the exit code it leads to.
    #[must_use]
    pub fn new(report: &FlattenReport, exit_code: ExitCode) -> Self {
        Self {
            root: path_string(&report.root),
            duplicates_dir: path_string(&report.duplicates_dir),
            started_at: report.started_at,
            duration_ms: u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX),
            interrupted: report.interrupted,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
            summary: report.summary(),
            files: report.files.iter().map(JsonFile::from_file_report).collect(),
            failures: report.failures(),
            pruned: report.prune.removed.iter().map(|p| path_string(p)).collect(),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    /// Write pretty JSON to a file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_to_file(&self, path: &Path) -> Result<(), JsonOutputError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = std::fs::File::create(path)?;
        self.write_to(&mut file, true)
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::MoveError;
    use crate::flatten::{ItemError, PruneReport};
    use std::path::PathBuf;
    use std::time::Duration;

    fn sample_report() -> FlattenReport {
        FlattenReport {
            root: PathBuf::from("/r"),
            duplicates_dir: PathBuf::from("/r/_duplicates"),
            files: vec![
                FileReport {
                    source: PathBuf::from("/r/a/x.txt"),
                    size: 4,
                    fingerprint: Some([0xab; 32]),
                    outcome: Outcome::Kept {
                        destination: PathBuf::from("/r/x.txt"),
                        moved: true,
                    },
                },
                FileReport {
                    source: PathBuf::from("/r/b/x.txt"),
                    size: 4,
                    fingerprint: Some([0xab; 32]),
                    outcome: Outcome::Duplicate {
                        destination: PathBuf::from("/r/_duplicates/x.txt"),
                        original: PathBuf::from("/r/x.txt"),
                    },
                },
                FileReport {
                    source: PathBuf::from("/r/c/y.txt"),
                    size: 2,
                    fingerprint: Some([0x01; 32]),
                    outcome: Outcome::Failed(ItemError::Move(MoveError::PermissionDenied(
                        PathBuf::from("/r/c/y.txt"),
                    ))),
                },
            ],
            scan_errors: Vec::new(),
            prune: PruneReport {
                removed: vec![PathBuf::from("/r/a"), PathBuf::from("/r/b")],
                failures: Vec::new(),
            },
            interrupted: false,
            started_at: Utc::now(),
            duration: Duration::from_millis(42),
        }
    }

    #[test]
    fn test_json_structure() {
        let output = JsonOutput::new(&sample_report(), ExitCode::PartialSuccess);
        let value: serde_json::Value = serde_json::from_str(&output.to_json().unwrap()).unwrap();

        assert_eq!(value["root"], "/r");
        assert_eq!(value["duration_ms"], 42);
        assert_eq!(value["exit_code"], 3);
        assert_eq!(value["exit_code_name"], "DF003");
        assert_eq!(value["summary"]["kept"], 1);
        assert_eq!(value["summary"]["duplicates"], 1);
        assert_eq!(value["summary"]["failed"], 1);
        assert_eq!(value["summary"]["pruned"], 2);
        assert_eq!(value["files"].as_array().unwrap().len(), 3);
        assert_eq!(value["pruned"][0], "/r/a");
    }

    #[test]
    fn test_json_file_fields_per_outcome() {
        let output = JsonOutput::new(&sample_report(), ExitCode::PartialSuccess);
        let value: serde_json::Value = serde_json::to_value(&output).unwrap();
        let files = value["files"].as_array().unwrap();

        assert_eq!(files[0]["outcome"], "kept");
        assert_eq!(files[0]["fingerprint"], "ab".repeat(32));
        assert!(files[0].get("original").is_none());

        assert_eq!(files[1]["outcome"], "duplicate");
        assert_eq!(files[1]["original"], "/r/x.txt");

        assert_eq!(files[2]["outcome"], "failed");
        assert_eq!(files[2]["error_kind"], "move");
        assert!(files[2].get("destination").is_none());

        let failures = value["failures"].as_array().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0]["kind"], "move");
        assert_eq!(failures[0]["path"], "/r/c/y.txt");
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("reports/run.json");

        JsonOutput::new(&sample_report(), ExitCode::Success)
            .write_to_file(&path)
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains('\n'));
        assert!(content.ends_with("}\n"));
    }
}
