//! Per-package engine constraints collected from the dependency graph

use super::Engine;
use crate::domain::range::is_wildcard;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Declared engine ranges of a single package, keyed by engine
pub type EngineRanges = BTreeMap<Engine, String>;

/// A package in the dependency graph together with its `engines` field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintEntry {
    /// Package name (e.g. `@scope/pkg`)
    pub name: String,
    /// Declared ranges for each engine the package mentions
    pub engines: EngineRanges,
}

impl ConstraintEntry {
    /// Creates a new constraint entry
    pub fn new(name: impl Into<String>, engines: EngineRanges) -> Self {
        Self {
            name: name.into(),
            engines,
        }
    }

    /// Creates an entry constraining a single engine
    pub fn single(name: impl Into<String>, engine: Engine, range: impl Into<String>) -> Self {
        let mut engines = EngineRanges::new();
        engines.insert(engine, range.into());
        Self::new(name, engines)
    }

    /// The declared range for an engine, if any
    pub fn range_for(&self, engine: Engine) -> Option<&str> {
        self.engines.get(&engine).map(String::as_str)
    }

    /// Returns true if any of the given engines has a range other than `*`
    pub fn constrains_any(&self, engines: &[Engine]) -> bool {
        engines
            .iter()
            .any(|e| self.range_for(*e).is_some_and(|r| !is_wildcard(r)))
    }

    fn sort_key(&self) -> (&str, &str) {
        (&self.name, self.range_for(Engine::Node).unwrap_or(""))
    }
}

impl Ord for ConstraintEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key()
            .cmp(&other.sort_key())
            .then_with(|| self.engines.cmp(&other.engines))
    }
}

impl PartialOrd for ConstraintEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ConstraintEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ranges: Vec<String> = self
            .engines
            .iter()
            .map(|(engine, range)| format!("{}: {}", engine, range))
            .collect();
        write!(f, "{} ({})", self.name, ranges.join(", "))
    }
}

/// Sorts and deduplicates entries into their canonical reporting order
pub fn canonicalize(mut entries: Vec<ConstraintEntry>) -> Vec<ConstraintEntry> {
    entries.sort();
    entries.dedup();
    entries
}
