//! Check that the installed engines are valid for both root and graph

use crate::domain::{Engine, Failure, FailureKind, ValidSet, Version};
use serde::Serialize;
use std::collections::BTreeMap;

/// One row of the current-version table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentRow {
    pub engine: Engine,
    /// None when the engine could not be probed
    pub version: Option<Version>,
    /// Valid for the package's own range
    pub root_valid: bool,
    /// Valid for the dependency graph's range
    pub graph_valid: bool,
}

impl CurrentRow {
    pub fn is_valid(&self) -> bool {
        self.root_valid && self.graph_valid
    }
}

/// Result of checking every selected engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CurrentReport {
    pub rows: Vec<CurrentRow>,
}

impl CurrentReport {
    pub fn is_valid(&self) -> bool {
        self.rows.iter().all(CurrentRow::is_valid)
    }

    /// The failure to report, if any engine is invalid
    pub fn failure(&self) -> Option<Failure> {
        let invalid: Vec<String> = self
            .rows
            .iter()
            .filter(|row| !row.is_valid())
            .map(|row| match &row.version {
                Some(version) => format!("{} {}", row.engine, version),
                None => format!("{} (not found)", row.engine),
            })
            .collect();
        if invalid.is_empty() {
            return None;
        }
        Some(Failure::new(
            FailureKind::Current,
            format!(
                "The current engine version is not valid for this project: {}",
                invalid.join(", ")
            ),
        ))
    }
}

/// Tests the installed version of each engine against both valid sets
pub fn check_current(
    engines: &[Engine],
    current: &BTreeMap<Engine, Option<Version>>,
    root_valids: &ValidSet,
    graph_valids: &ValidSet,
) -> CurrentReport {
    let contains = |valids: &ValidSet, engine: Engine, version: &Version| {
        valids.get(&engine).is_some_and(|list| list.contains(version))
    };

    let rows = engines
        .iter()
        .map(|engine| {
            let version = current.get(engine).cloned().flatten();
            let (root_valid, graph_valid) = match &version {
                Some(v) => (
                    contains(root_valids, *engine, v),
                    contains(graph_valids, *engine, v),
                ),
                None => (false, false),
            };
            CurrentRow {
                engine: *engine,
                version,
                root_valid,
                graph_valid,
            }
        })
        .collect();
    CurrentReport { rows }
}
