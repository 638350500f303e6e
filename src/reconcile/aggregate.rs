//! Intersection of per-package engine constraints

use super::evaluator::filter_str;
use crate::domain::{
    sort_descending, ConstraintEntry, Engine, EngineRanges, ValidSet, Version, VersionCatalog,
};
use crate::error::RangeError;
use serde::Serialize;
use std::collections::BTreeSet;

/// What a single package allows, per engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageValids {
    pub name: String,
    /// Ranges as declared by the package
    pub engines: EngineRanges,
    /// Catalog versions each declared range accepts
    pub valids: ValidSet,
}

/// Result of aggregating the dependency graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphValids {
    /// One element per constraint entry, in entry order
    pub allowed: Vec<PackageValids>,
    /// Per engine, versions every package accepts (newest first)
    pub valids: ValidSet,
}

impl GraphValids {
    /// The intersection for one engine
    pub fn versions(&self, engine: Engine) -> &[Version] {
        self.valids.get(&engine).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Computes per-package valid sets and their intersection for every catalog engine
///
/// An empty entry list leaves every engine unconstrained.
pub fn aggregate(
    entries: &[ConstraintEntry],
    catalog: &VersionCatalog,
) -> Result<GraphValids, RangeError> {
    let mut allowed = Vec::with_capacity(entries.len());
    for entry in entries {
        let mut valids = ValidSet::new();
        for engine in catalog.engines() {
            let versions = filter_str(catalog.versions(engine), entry.range_for(engine))?;
            valids.insert(engine, versions);
        }
        allowed.push(PackageValids {
            name: entry.name.clone(),
            engines: entry.engines.clone(),
            valids,
        });
    }

    let mut valids = ValidSet::new();
    for engine in catalog.engines() {
        let mut common: BTreeSet<_> = catalog.versions(engine).iter().cloned().collect();
        for package in &allowed {
            let theirs: BTreeSet<_> = package
                .valids
                .get(&engine)
                .map(|v| v.iter().cloned().collect())
                .unwrap_or_default();
            common = common.intersection(&theirs).cloned().collect();
        }
        valids.insert(engine, sort_descending(common.into_iter().collect()));
    }

    Ok(GraphValids { allowed, valids })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> VersionCatalog {
        let versions = [
            "v14.0.0", "v14.21.0", "v16.0.0", "v16.20.0", "v18.0.0", "v18.19.0", "v20.0.0",
            "v20.10.0",
        ]
        .iter()
        .map(|s| Version::parse(s).unwrap())
        .collect();
        VersionCatalog::new().with_engine(Engine::Node, versions)
    }

    fn raws(versions: &[Version]) -> Vec<&str> {
        versions.iter().map(|v| v.raw()).collect()
    }

    #[test]
    fn test_empty_graph_is_full_catalog() {
        let catalog = catalog();
        let graph = aggregate(&[], &catalog).unwrap();
        assert!(graph.allowed.is_empty());
        assert_eq!(graph.versions(Engine::Node), catalog.versions(Engine::Node));
    }

    #[test]
    fn test_single_entry() {
        let entries = vec![ConstraintEntry::single("one", Engine::Node, ">=16")];
        let graph = aggregate(&entries, &catalog()).unwrap();
        assert_eq!(
            raws(graph.versions(Engine::Node)),
            vec!["v20.10.0", "v20.0.0", "v18.19.0", "v18.0.0", "v16.20.0", "v16.0.0"]
        );
        assert_eq!(graph.allowed.len(), 1);
        assert_eq!(graph.allowed[0].name, "one");
    }

    #[test]
    fn test_intersection_of_entries() {
        let entries = vec![
            ConstraintEntry::single("one", Engine::Node, ">=16"),
            ConstraintEntry::single("two", Engine::Node, "<20"),
        ];
        let graph = aggregate(&entries, &catalog()).unwrap();
        assert_eq!(
            raws(graph.versions(Engine::Node)),
            vec!["v18.19.0", "v18.0.0", "v16.20.0", "v16.0.0"]
        );
    }

    #[test]
    fn test_order_independent() {
        let a = ConstraintEntry::single("one", Engine::Node, "^16 || ^18");
        let b = ConstraintEntry::single("two", Engine::Node, ">=18");
        let forward = aggregate(&[a.clone(), b.clone()], &catalog()).unwrap();
        let backward = aggregate(&[b, a], &catalog()).unwrap();
        assert_eq!(forward.valids, backward.valids);
    }

    #[test]
    fn test_monotonic_in_entries() {
        let mut entries = vec![ConstraintEntry::single("one", Engine::Node, ">=14")];
        let smaller = aggregate(&entries, &catalog()).unwrap();
        entries.push(ConstraintEntry::single("two", Engine::Node, "^18 || ^20"));
        let larger = aggregate(&entries, &catalog()).unwrap();
        let before = smaller.versions(Engine::Node);
        let after = larger.versions(Engine::Node);
        assert!(after.len() <= before.len());
        assert!(after.iter().all(|v| before.contains(v)));
    }

    #[test]
    fn test_entry_without_engine_is_wildcard() {
        let entries = vec![ConstraintEntry::single("npm-only", Engine::Npm, ">=9")];
        let graph = aggregate(&entries, &catalog()).unwrap();
        assert_eq!(graph.versions(Engine::Node).len(), 8);
    }

    #[test]
    fn test_invalid_range_fails() {
        let entries = vec![ConstraintEntry::single("bad", Engine::Node, ">=>=")];
        assert!(aggregate(&entries, &catalog()).is_err());
    }
}
