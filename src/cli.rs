//! Command-line interface definitions.
//!
//! All arguments are defined with the clap derive API. Options that also
//! exist in the configuration file are `Option`s here: a flag only
//! overrides the file and environment when it is actually given.
//!
//! # Example
//!
//! ```bash
//! # Flatten a folder, quarantining duplicates in ./_duplicates
//! dedupe-flatten ~/Pictures/import
//!
//! # Keep the original naming scheme for quarantined copies
//! dedupe-flatten ~/Pictures/import --duplicate-suffix _dup
//!
//! # Machine-readable report, errors as JSON
//! dedupe-flatten ~/Pictures/import -o json --json-errors
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Flatten a directory tree into its root, quarantining duplicate files.
///
/// Every file below PATH is moved into PATH itself. When several files have
/// identical content, the first one (shallowest, then alphabetical) is kept
/// and the others are moved into a quarantine folder inside PATH.
/// Directories left empty are removed.
#[derive(Debug, Parser)]
#[command(name = "dedupe-flatten")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to flatten
    #[arg(value_name = "PATH", required_unless_present = "print_config")]
    pub path: Option<PathBuf>,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print fatal errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,

    /// Report format written to stdout
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Also write the JSON report to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Configuration file (default: platform config directory)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Named profile from the configuration file
    #[arg(long, value_name = "NAME")]
    pub profile: Option<String>,

    /// Name of the quarantine folder created in PATH
    #[arg(long, value_name = "NAME")]
    pub duplicates_dir: Option<String>,

    /// Suffix added to quarantined file names (e.g. _dup)
    #[arg(long, value_name = "SUFFIX", allow_hyphen_values = true)]
    pub duplicate_suffix: Option<String>,

    /// Maximum number of numbered names tried on a collision
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_rename_attempts: Option<u32>,

    /// Read buffer size for hashing (e.g. 64KiB, 1MiB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub hash_buffer_size: Option<usize>,

    /// Treat symbolic links to regular files as files
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Skip hidden files and directories
    #[arg(long)]
    pub skip_hidden: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,
}

/// Report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Colored human-readable summary
    #[default]
    Text,
    /// Full JSON report
    Json,
    /// One CSV row per file
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

/// Parse a human-readable size such as `4096`, `64KB`, `64KiB` or `1MiB`.
///
/// Decimal suffixes (KB, MB, GB) are powers of 1000; binary suffixes (KiB,
/// MiB, GiB) are powers of 1024. Suffixes are case-insensitive.
///
/// # Errors
///
/// Returns a message suitable for clap when the input is malformed.
pub fn parse_size(s: &str) -> Result<usize, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: f64 = match suffix.as_str() {
        "" | "B" => 1.0,
        "KB" | "K" => 1_000.0,
        "KIB" => 1_024.0,
        "MB" | "M" => 1_000_000.0,
        "MIB" => 1_048_576.0,
        "GB" | "G" => 1_000_000_000.0,
        "GIB" => 1_073_741_824.0,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    let bytes = num * multiplier;
    if !bytes.is_finite() || bytes > usize::MAX as f64 {
        return Err(format!("Size too large: '{s}'"));
    }

    Ok(bytes as usize)
}
