//! Text output formatter for human-readable display
//!
//! This module provides:
//! - The latest-majors table and the package vs graph engines table
//! - Verdict messages with the `package.json` snippet that fixes them
//! - Conflicting packages behind a failed check
//! - The current-version table

use crate::domain::{
    Conflicts, Engine, Failure, FailureKind, RangeSource, Remediation, VerdictKind,
};
use crate::orchestrator::Report;
use crate::output::table::{wrap_list, Table};
use crate::output::{OutputFormatter, Verbosity};
use crate::reconcile::{CurrentReport, EnginesOutcome};
use colored::Colorize;
use std::io::Write;

/// Heading of the latest-majors table; also the wrap width of its cells
pub const MAJORS_HEADING: &str =
    "Currently available latest release of each valid major version:";

const COMMAND: &str = "enginefit";

/// Text formatter for human-readable output
pub struct TextFormatter {
    /// Verbosity level
    verbosity: Verbosity,
    /// Whether to use colors
    color: bool,
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            color: true,
        }
    }

    /// Create a new text formatter with color option
    pub fn with_color(verbosity: Verbosity, color: bool) -> Self {
        Self { verbosity, color }
    }

    fn success(&self, text: &str) -> String {
        if self.color {
            text.green().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn error(&self, text: &str) -> String {
        if self.color {
            text.red().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn code(&self, text: &str) -> String {
        if self.color {
            text.blue().to_string()
        } else {
            text.to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.color {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }

    fn yes_no(&self, valid: bool) -> String {
        match (valid, self.color) {
            (true, true) => "yes!".green().to_string(),
            (false, true) => "no!".red().to_string(),
            (true, false) => "yes!".to_string(),
            (false, false) => "no!".to_string(),
        }
    }

    fn write_majors(&self, report: &Report, writer: &mut dyn Write) -> std::io::Result<()> {
        let mut table = Table::new(["engine".to_string(), self.dim(MAJORS_HEADING)]);
        for engine in &report.engines {
            let versions: Vec<String> = report
                .majors
                .get(engine)
                .map(|majors| majors.display().iter().map(|v| v.to_string()).collect())
                .unwrap_or_default();
            let cell = if versions.is_empty() {
                "none".to_string()
            } else {
                wrap_list(&versions, MAJORS_HEADING.len())
            };
            table = table.row([engine.key().to_string(), cell]);
        }
        writeln!(writer, "{}", table.render())
    }

    fn write_engines(&self, report: &Report, writer: &mut dyn Write) -> std::io::Result<()> {
        let root = Remediation::new(report.source, report.root_ranges.clone()).snippet();
        let graph = if report.graph_entries.is_empty() {
            "N/A".to_string()
        } else {
            let ranges = report
                .graph_ranges
                .iter()
                .map(|(engine, compact)| (*engine, compact.display.clone()))
                .collect();
            Remediation::new(RangeSource::Engines, ranges).snippet()
        };
        let table = Table::new([
            self.dim(&format!("package {}:", report.source.field())),
            self.dim("dependency graph engines:"),
        ])
        .row([root, graph]);
        writeln!(writer, "{}", table.render())
    }

    fn write_graph_entries(&self, report: &Report, writer: &mut dyn Write) -> std::io::Result<()> {
        writeln!(writer, "Packages constraining the engines ({}):", report.mode)?;
        for entry in &report.graph_entries {
            let ranges: Vec<String> = entry
                .engines
                .iter()
                .filter(|(engine, _)| report.engines.contains(*engine))
                .map(|(engine, range)| format!("{} {}", engine, range))
                .collect();
            writeln!(writer, "  {} {}", entry.name, self.dim(&ranges.join(", ")))?;
        }
        Ok(())
    }

    fn write_current(&self, current: &CurrentReport, writer: &mut dyn Write) -> std::io::Result<()> {
        let mut table = Table::new([
            "engine",
            "current version",
            "valid (package)",
            "valid (dependency graph)",
        ]);
        for row in &current.rows {
            let version = row
                .version
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "not found".to_string());
            table = table.row([
                row.engine.key().to_string(),
                version,
                self.yes_no(row.root_valid),
                self.yes_no(row.graph_valid),
            ]);
        }
        writeln!(writer, "{}", table.render())
    }

    fn write_outcome(
        &self,
        report: &Report,
        outcome: &EnginesOutcome,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        writeln!(writer)?;
        writeln!(writer, "{}", self.success(&outcome.message))?;
        if outcome.verdict.kind != VerdictKind::RootSubset {
            return Ok(());
        }
        if let Some(remediation) = &outcome.remediation {
            let hint = if report.save.requested {
                format!(
                    "`{}` will automatically widen your support, per the `--save` option, by adding the following to your `package.json`:",
                    COMMAND
                )
            } else {
                format!(
                    "If you want to widen your support, you can run `{} --save`, or manually add the following to your `package.json`:",
                    COMMAND
                )
            };
            writeln!(writer, "\n{}", hint)?;
            writeln!(writer, "{}", self.code(&remediation.snippet()))?;
        }
        Ok(())
    }

    fn write_conflicts(&self, conflicts: &Conflicts, writer: &mut dyn Write) -> std::io::Result<()> {
        if conflicts.values().all(Vec::is_empty) {
            return Ok(());
        }
        writeln!(writer, "\nConflicting dependencies:")?;
        for (engine, list) in conflicts {
            for conflict in list {
                writeln!(
                    writer,
                    "  {} {} {}",
                    conflict.package,
                    self.code(&format!("\"{}\": \"{}\"", engine, conflict.ranges.join(" || "))),
                    self.dim(&excluded_summary(*engine, conflict.versions.len())),
                )?;
            }
        }
        Ok(())
    }

    fn write_failure(
        &self,
        report: &Report,
        failure: &Failure,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        if failure.kind == FailureKind::Current {
            if let Some(current) = &report.current {
                self.write_current(current, writer)?;
            }
        }
        writeln!(writer)?;
        writeln!(writer, "{}", self.error(&failure.message))?;

        if let Some(remediation) = &failure.remediation {
            let hint = if report.save.requested {
                format!(
                    "`{}` will automatically fix this, per the `--save` option, by adding the following to your `package.json`:",
                    COMMAND
                )
            } else {
                format!(
                    "You can fix this by running `{} --save`, or by manually adding the following to your `package.json`:",
                    COMMAND
                )
            };
            writeln!(writer, "\n{}", hint)?;
            writeln!(writer, "{}", self.code(&remediation.snippet()))?;
        }

        if self.verbosity != Verbosity::Quiet {
            if let Some(verdict) = &failure.verdict {
                self.write_conflicts(&verdict.conflicts, writer)?;
            }
        }
        Ok(())
    }
}

fn excluded_summary(engine: Engine, count: usize) -> String {
    let noun = if count == 1 { "version" } else { "versions" };
    format!(
        "(excludes {} {} {} your package allows)",
        count,
        engine.display_name(),
        noun
    )
}

impl OutputFormatter for TextFormatter {
    fn format(
        &self,
        report: &Report,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> std::io::Result<()> {
        if self.verbosity != Verbosity::Quiet {
            self.write_majors(report, out)?;
            self.write_engines(report, out)?;
            if self.verbosity == Verbosity::Verbose {
                self.write_graph_entries(report, out)?;
            }
        }

        if let Some(outcome) = &report.outcome {
            self.write_outcome(report, outcome, out)?;
        }

        for failure in &report.failures {
            self.write_failure(report, failure, err)?;
        }

        if let Some(current) = &report.current {
            if current.is_valid() && self.verbosity != Verbosity::Quiet {
                writeln!(out)?;
                self.write_current(current, out)?;
            }
        }

        if let Some(error) = &report.save.error {
            writeln!(
                err,
                "\n{}",
                self.error(&format!(
                    "Failed to save {}: {}",
                    report.manifest.display(),
                    error
                ))
            )?;
        }
        Ok(())
    }
}
