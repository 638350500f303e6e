//! Reconciliation verdicts and failure values

use super::{Engine, Version};
use crate::exit::ExitStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How the root's valid versions relate to the graph's for one engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// Both sides accept exactly the same versions
    Same,
    /// The root accepts versions the graph cannot support
    Superset,
    /// The root is stricter than the graph requires
    Subset,
    /// Neither side contains the other
    Disjoint,
}

/// Overall classification across all selected engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictKind {
    Exact,
    RootSuperset,
    RootSubset,
    Disjoint,
}

impl VerdictKind {
    /// Returns true if the root declaration is at least as strict as required
    pub fn is_success(&self) -> bool {
        matches!(self, VerdictKind::Exact | VerdictKind::RootSubset)
    }
}

impl fmt::Display for VerdictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            VerdictKind::Exact => "exact",
            VerdictKind::RootSuperset => "root superset",
            VerdictKind::RootSubset => "root subset",
            VerdictKind::Disjoint => "disjoint",
        };
        f.write_str(label)
    }
}

/// A dependency whose own range excludes versions the root allows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    /// Package name
    pub package: String,
    /// Declared ranges of the package (deduplicated)
    pub ranges: Vec<String>,
    /// Root-valid versions the package does not support
    pub versions: Vec<Version>,
}

/// Conflicts grouped by engine, each list sorted by package name
pub type Conflicts = BTreeMap<Engine, Vec<Conflict>>;

/// Terminal result of comparing root and graph valid versions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub kind: VerdictKind,
    /// Per-engine relation that produced the overall kind
    pub relations: BTreeMap<Engine, Relation>,
    /// Display ranges computed from the dependency graph
    pub graph_ranges: BTreeMap<Engine, String>,
    /// Only populated for `RootSuperset` and `Disjoint`
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub conflicts: Conflicts,
}

/// Which manifest field the root range was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RangeSource {
    /// `engines.<engine>`
    #[default]
    Engines,
    /// `devEngines.runtime[].version` of a private package
    DevEngines,
}

impl RangeSource {
    /// The package.json field name
    pub fn field(&self) -> &'static str {
        match self {
            RangeSource::Engines => "engines",
            RangeSource::DevEngines => "devEngines",
        }
    }
}

/// The manifest edit that would make the root match the graph exactly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remediation {
    pub field: RangeSource,
    pub ranges: BTreeMap<Engine, String>,
}

impl Remediation {
    pub fn new(field: RangeSource, ranges: BTreeMap<Engine, String>) -> Self {
        Self { field, ranges }
    }

    /// Renders the edit as the JSON snippet a user would paste
    pub fn snippet(&self) -> String {
        let body = match self.field {
            RangeSource::Engines => {
                let map: serde_json::Map<String, serde_json::Value> = self
                    .ranges
                    .iter()
                    .map(|(engine, range)| (engine.key().to_string(), range.clone().into()))
                    .collect();
                serde_json::Value::Object(map)
            }
            RangeSource::DevEngines => {
                let runtimes: Vec<serde_json::Value> = self
                    .ranges
                    .iter()
                    .map(|(engine, range)| {
                        serde_json::json!({ "name": engine.key(), "version": range })
                    })
                    .collect();
                let runtime = if runtimes.len() == 1 {
                    runtimes.into_iter().next().unwrap_or_default()
                } else {
                    serde_json::Value::Array(runtimes)
                };
                serde_json::json!({ "runtime": runtime })
            }
        };
        let pretty = serde_json::to_string_pretty(&body).unwrap_or_default();
        format!("\"{}\": {}", self.field.field(), pretty)
    }
}

/// Why the root declaration was left unspecified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Omission {
    /// No selected engine has a range
    AllOmitted,
    /// Some selected engines have no range
    SomeOmitted,
    /// Every selected engine is set to `*`
    AllWildcard,
    /// Some selected engines are set to `*`
    SomeWildcard,
}

/// Kinds of failed checks, each with its own exit bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum FailureKind {
    /// The root range is missing or `*`
    Implicit(Omission),
    /// The root allows versions the graph cannot support
    Inexact,
    /// Root and graph overlap without either containing the other
    Disjoint,
    /// `devEngines` allows versions that `engines` does not
    DevEngines,
    /// The installed engine is outside the valid versions
    Current,
}

impl FailureKind {
    /// Exit bit reported for this failure
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            FailureKind::Implicit(_) => ExitStatus::IMPLICIT,
            FailureKind::Inexact => ExitStatus::INEXACT,
            FailureKind::Disjoint => ExitStatus::DISJOINT,
            FailureKind::DevEngines => ExitStatus::DEV_ENGINES,
            FailureKind::Current => ExitStatus::CURRENT,
        }
    }
}

/// A failed check, carried as a value rather than raised
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
    /// The verdict behind an engines failure, when one was computed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<Remediation>,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            verdict: None,
            remediation: None,
        }
    }

    pub fn with_verdict(mut self, verdict: Verdict) -> Self {
        self.verdict = Some(verdict);
        self
    }

    pub fn with_remediation(mut self, remediation: Remediation) -> Self {
        self.remediation = Some(remediation);
        self
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
