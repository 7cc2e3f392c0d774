//! Exit codes and structured error output.

use serde::Serialize;

use crate::flatten::FlattenReport;

/// Process exit codes.
///
/// - 0: Success (every file processed, nothing failed)
/// - 1: General error (invalid root, bad arguments, unexpected failure)
/// - 3: Partial success (the run finished but some items failed)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// The run completed without any failure.
    Success = 0,
    /// A fatal error stopped the run.
    GeneralError = 1,
    /// The run completed but at least one file or directory failed.
    PartialSuccess = 3,
    /// The run was stopped by Ctrl+C.
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "DF000",
            Self::GeneralError => "DF001",
            Self::PartialSuccess => "DF003",
            Self::Interrupted => "DF130",
        }
    }

    /// Exit code for a finished run. Interruption wins over failures.
    #[must_use]
    pub fn from_report(report: &FlattenReport) -> Self {
        if report.interrupted {
            Self::Interrupted
        } else if report.has_failures() {
            Self::PartialSuccess
        } else {
            Self::Success
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "DF001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
