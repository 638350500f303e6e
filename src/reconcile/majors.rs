//! Latest release of each major version line

use crate::domain::{sort_descending, Engine, Range, Version, VersionCatalog};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Latest majors allowed by the root and by the graph for one engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineMajors {
    pub root: Vec<Version>,
    pub graph: Vec<Version>,
}

impl EngineMajors {
    /// Versions shown to the user: both sides, or the root alone without a graph range
    pub fn display(&self) -> Vec<Version> {
        if self.graph.is_empty() {
            return self.root.clone();
        }
        let graph: BTreeSet<&Version> = self.graph.iter().collect();
        self.root
            .iter()
            .filter(|v| graph.contains(v))
            .cloned()
            .collect()
    }
}

/// Picks the highest satisfying version of every major line, newest first
///
/// Each `0.minor` line counts as its own major.
pub fn latest_majors(versions: &[Version], range: &Range) -> Vec<Version> {
    let mut buckets: BTreeMap<(u64, Option<u64>), &Version> = BTreeMap::new();
    for version in versions.iter().filter(|v| range.test(v)) {
        buckets
            .entry(version.compat_key())
            .and_modify(|best| {
                if version > *best {
                    *best = version;
                }
            })
            .or_insert(version);
    }
    sort_descending(buckets.into_values().cloned().collect())
}

/// Runs [`latest_majors`] with the root and graph range of every selected engine
pub fn latest_engine_majors(
    engines: &[Engine],
    catalog: &VersionCatalog,
    root_ranges: &BTreeMap<Engine, Range>,
    graph_ranges: &BTreeMap<Engine, Range>,
) -> BTreeMap<Engine, EngineMajors> {
    engines
        .iter()
        .map(|engine| {
            let versions = catalog.versions(*engine);
            let root = root_ranges.get(engine).cloned().unwrap_or_default();
            let majors = EngineMajors {
                root: latest_majors(versions, &root),
                graph: graph_ranges
                    .get(engine)
                    .map(|range| latest_majors(versions, range))
                    .unwrap_or_default(),
            };
            (*engine, majors)
        })
        .collect()
}
