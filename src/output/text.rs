//! Human-readable summary of a flatten report.
//!
//! ```text
//! Flattened /data/photos in 1.20s
//!   Kept          120  (95 moved, 25 in place, 3 renamed)
//!   Duplicates     14  -> /data/photos/_duplicates
//!   Failed          1
//!   Pruned dirs    18
//!   Relocated   1.2 GiB
//!
//! Failures:
//!   [move] /data/photos/a/locked.jpg: permission denied: /data/photos/a/locked.jpg
//! ```

use std::io::{self, Write};

use bytesize::ByteSize;
use yansi::{Condition, Paint, Style};

use crate::flatten::FlattenReport;

/// Text summary formatter.
pub struct TextOutput<'a> {
    report: &'a FlattenReport,
    color: bool,
}

impl<'a> TextOutput<'a> {
    /// Create a formatter; `color` enables ANSI styling.
    #[must_use]
    pub fn new(report: &'a FlattenReport, color: bool) -> Self {
        Self { report, color }
    }

    fn paint(&self, text: impl std::fmt::Display, style: Style) -> String {
        if self.color {
            text.to_string()
                .paint(style)
                .whenever(Condition::ALWAYS)
                .to_string()
        } else {
            text.to_string()
        }
    }

    /// Write the summary.
    ///
    /// # Errors
    ///
    /// Returns any error from the writer.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let report = self.report;
        let summary = report.summary();

        let heading = if report.interrupted {
            self.paint("Interrupted while flattening", Style::new().yellow().bold())
        } else {
            self.paint("Flattened", Style::new().bold())
        };
        writeln!(
            writer,
            "{} {} in {:.2?}",
            heading,
            report.root.display(),
            report.duration
        )?;

        writeln!(
            writer,
            "  Kept        {}  ({} moved, {} in place, {} renamed)",
            self.paint(format!("{:>5}", summary.kept), Style::new().green()),
            summary.moved,
            summary.in_place,
            summary.renamed
        )?;

        if summary.duplicates > 0 {
            writeln!(
                writer,
                "  Duplicates  {}  -> {}",
                self.paint(format!("{:>5}", summary.duplicates), Style::new().cyan()),
                report.duplicates_dir.display()
            )?;
        } else {
            writeln!(writer, "  Duplicates  {:>5}", 0)?;
        }

        let failed_style = if summary.failed > 0 {
            Style::new().red().bold()
        } else {
            Style::new()
        };
        writeln!(
            writer,
            "  Failed      {}",
            self.paint(format!("{:>5}", summary.failed), failed_style)
        )?;
        writeln!(writer, "  Pruned dirs {:>5}", summary.pruned)?;
        writeln!(
            writer,
            "  Relocated   {}",
            ByteSize::b(summary.bytes_relocated)
        )?;

        let failures = report.failures();
        if !failures.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "{}", self.paint("Failures:", Style::new().red().bold()))?;
            for failure in failures {
                writeln!(
                    writer,
                    "  [{}] {}: {}",
                    failure.kind,
                    failure.path.display(),
                    failure.message
                )?;
            }
        }

        Ok(())
    }

    /// Render the summary as a string.
    #[must_use]
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write_to(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}
