//! JSON output formatter for machine processing
//!
//! This module provides:
//! - One JSON object per run with ranges, majors, verdict and failures
//! - The exit status as both number and bit names

use crate::domain::{
    ConstraintEntry, Engine, EngineRanges, Failure, RangeSource, Remediation, Verdict, Version,
};
use crate::orchestrator::Report;
use crate::output::{OutputFormatter, Verbosity};
use crate::reconcile::CurrentReport;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    /// Verbosity level affects detail in output
    verbosity: Verbosity,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

/// JSON representation of the full report
#[derive(Serialize)]
struct JsonOutput<'a> {
    manifest: String,
    mode: String,
    engines: &'a [Engine],
    /// `engines` or `devEngines`
    source: RangeSource,
    root: &'a EngineRanges,
    /// Compact graph range per engine
    graph: BTreeMap<Engine, &'a str>,
    /// Latest release of each valid major, newest first
    majors: BTreeMap<Engine, Vec<Version>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    verdict: Option<&'a Verdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    /// Widening suggested for a stricter root
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<&'a Remediation>,
    failures: &'a [Failure],
    #[serde(skip_serializing_if = "Option::is_none")]
    current: Option<&'a CurrentReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    saved: Vec<&'a Remediation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    save_error: Option<&'a str>,
    /// Constraining packages (only in verbose mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    packages: Option<&'a [ConstraintEntry]>,
    exit: JsonExit,
}

#[derive(Serialize)]
struct JsonExit {
    code: u8,
    status: Vec<&'static str>,
}

impl<'a> JsonOutput<'a> {
    fn from_report(report: &'a Report, verbose: bool) -> Self {
        // A failed engines check still carries the verdict it was based on
        let verdict = report
            .outcome
            .as_ref()
            .map(|outcome| &outcome.verdict)
            .or_else(|| report.failures.iter().find_map(|f| f.verdict.as_ref()));

        Self {
            manifest: report.manifest.display().to_string(),
            mode: report.mode.to_string(),
            engines: &report.engines,
            source: report.source,
            root: &report.root_ranges,
            graph: report
                .graph_ranges
                .iter()
                .map(|(engine, compact)| (*engine, compact.display.as_str()))
                .collect(),
            majors: report
                .majors
                .iter()
                .map(|(engine, majors)| (*engine, majors.display()))
                .collect(),
            verdict,
            message: report.outcome.as_ref().map(|o| o.message.as_str()),
            suggestion: report.outcome.as_ref().and_then(|o| o.remediation.as_ref()),
            failures: &report.failures,
            current: report.current.as_ref(),
            saved: report.save.saved.iter().collect(),
            save_error: report.save.error.as_deref(),
            packages: verbose.then_some(report.graph_entries.as_slice()),
            exit: JsonExit {
                code: report.status.bits(),
                status: report.status.names(),
            },
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(
        &self,
        report: &Report,
        out: &mut dyn Write,
        _err: &mut dyn Write,
    ) -> std::io::Result<()> {
        let output = JsonOutput::from_report(report, self.verbosity == Verbosity::Verbose);
        let json = serde_json::to_string_pretty(&output).map_err(std::io::Error::other)?;
        writeln!(out, "{}", json)
    }
}
