//! dedupe-flatten - flatten a directory tree and quarantine duplicate files
//!
//! Every regular file below a root folder is moved into the root itself.
//! Files are identified by their BLAKE3 content hash: the first copy of each
//! content is kept, later copies are moved into a quarantine folder inside
//! the root, and subdirectories left empty are removed. Running it again on
//! a flattened folder changes nothing.

pub mod actions;
pub mod cli;
pub mod config;
pub mod error;
pub mod flatten;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use anyhow::Context;

use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::error::ExitCode;
use crate::flatten::Flattener;
use crate::output::{CsvOutput, JsonOutput, TextOutput};
use crate::progress::{Progress, ProgressCallback};

/// Run the application for parsed command-line arguments.
///
/// # Errors
///
/// Returns an error for invalid options, an invalid root, or a report that
/// cannot be written. Per-file failures are not errors; they show up in the
/// returned exit code.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let mut config = Config::load(cli.config.as_deref(), cli.profile.as_deref());
    config.merge_cli(&cli);
    config.validate().context("invalid options")?;

    if cli.print_config {
        let toml = config.to_toml().context("failed to render configuration")?;
        print!("{toml}");
        return Ok(ExitCode::Success);
    }

    let path = cli.path.as_deref().context("no directory given")?;

    let handler = signal::install_handler()?;
    let progress: Arc<dyn ProgressCallback> = Arc::new(Progress::new(cli.quiet));
    let flatten_config = config
        .to_flatten_config()
        .with_shutdown_flag(handler.get_flag())
        .with_progress_callback(progress);

    log::debug!("Effective configuration: {:?}", flatten_config);

    let report = Flattener::new(flatten_config)
        .run(path)
        .with_context(|| format!("cannot flatten {}", path.display()))?;
    let exit_code = ExitCode::from_report(&report);

    let stdout = io::stdout();
    let color = !cli.no_color && stdout.is_terminal();
    let mut out = stdout.lock();

    match cli.output {
        OutputFormat::Text => {
            if !cli.quiet {
                TextOutput::new(&report, color).write_to(&mut out)?;
            }
        }
        OutputFormat::Json => JsonOutput::new(&report, exit_code).write_to(&mut out, true)?,
        OutputFormat::Csv => CsvOutput::new(&report).write_to(&mut out)?,
    }
    out.flush()?;

    if let Some(ref report_path) = cli.report {
        JsonOutput::new(&report, exit_code)
            .write_to_file(report_path)
            .with_context(|| format!("failed to write report to {}", report_path.display()))?;
        log::info!("Report written to {}", report_path.display());
    }

    Ok(exit_code)
}
