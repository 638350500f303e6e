//! Version catalogs and valid-version sets

use super::{Engine, Version};
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-engine versions satisfying some range, each list newest first
pub type ValidSet = BTreeMap<Engine, Vec<Version>>;

/// Every known release of each engine, newest first, without duplicates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VersionCatalog {
    versions: BTreeMap<Engine, Vec<Version>>,
}

impl VersionCatalog {
    /// Creates an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the release list of an engine
    pub fn with_engine(mut self, engine: Engine, versions: Vec<Version>) -> Self {
        self.insert(engine, versions);
        self
    }

    /// Inserts the release list of an engine, normalizing its order
    pub fn insert(&mut self, engine: Engine, versions: Vec<Version>) {
        self.versions.insert(engine, sort_descending(versions));
    }

    /// Releases of an engine, newest first (empty for unknown engines)
    pub fn versions(&self, engine: Engine) -> &[Version] {
        self.versions.get(&engine).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Engines present in the catalog, in stable order
    pub fn engines(&self) -> impl Iterator<Item = Engine> + '_ {
        self.versions.keys().copied()
    }

    /// Returns true if the catalog has a release list for the engine
    pub fn contains(&self, engine: Engine) -> bool {
        self.versions.contains_key(&engine)
    }

    /// Returns true if no engine has been added
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// Sorts versions newest first and drops duplicates
pub fn sort_descending(mut versions: Vec<Version>) -> Vec<Version> {
    versions.sort_by(|a, b| b.cmp(a));
    versions.dedup();
    versions
}
