//! Classification of the root declaration against the dependency graph
//!
//! This module provides:
//! - Per-engine set relations between root and graph valid versions
//! - The overall verdict and its remediation
//! - Attribution of conflicts to the packages that cause them
//! - The `devEngines` ⊆ `engines` check for published packages

use super::aggregate::{GraphValids, PackageValids};
use crate::domain::{
    is_wildcard, CompactRange, Conflict, Engine, EngineRanges, Failure, FailureKind, Omission,
    RangeSource, Relation, Remediation, ValidSet, Verdict, VerdictKind, Version, WILDCARD,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Everything the engines check needs, borrowed from the orchestrator
#[derive(Debug, Clone, Copy)]
pub struct EnginesCheck<'a> {
    /// Engines selected for checking
    pub engines: &'a [Engine],
    /// Field the root ranges were read from
    pub source: RangeSource,
    /// Root ranges as declared; absent engines were omitted
    pub root_ranges: &'a EngineRanges,
    /// Catalog versions the root ranges accept
    pub root_valids: &'a ValidSet,
    /// Aggregated dependency graph
    pub graph: &'a GraphValids,
    /// Compacted graph ranges
    pub graph_ranges: &'a BTreeMap<Engine, CompactRange>,
}

/// Successful outcome of the engines check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnginesOutcome {
    pub verdict: Verdict,
    pub message: String,
    /// Present when the root is stricter than required
    pub remediation: Option<Remediation>,
}

/// Relation of one engine's root valid set to its graph valid set
pub fn classify_relation(root: &[Version], graph: &[Version]) -> Relation {
    let root: BTreeSet<&Version> = root.iter().collect();
    let graph: BTreeSet<&Version> = graph.iter().collect();
    let union = root.union(&graph).count();
    if union == root.len() && union == graph.len() {
        Relation::Same
    } else if graph.is_subset(&root) {
        Relation::Superset
    } else if root.is_subset(&graph) {
        Relation::Subset
    } else {
        Relation::Disjoint
    }
}

/// Folds per-engine relations into the overall verdict kind
pub fn verdict_kind<'a>(relations: impl IntoIterator<Item = &'a Relation>) -> VerdictKind {
    let relations: Vec<&Relation> = relations.into_iter().collect();
    if relations.iter().all(|r| **r == Relation::Same) {
        VerdictKind::Exact
    } else if relations.iter().any(|r| **r == Relation::Disjoint) {
        VerdictKind::Disjoint
    } else if relations.iter().any(|r| **r == Relation::Superset) {
        VerdictKind::RootSuperset
    } else {
        VerdictKind::RootSubset
    }
}

/// Packages that reject some root-valid version of `engine`
///
/// Entries sharing a package name are merged; the result is sorted by name.
pub fn attribute_conflicts(
    engine: Engine,
    root_valid: &[Version],
    allowed: &[PackageValids],
) -> Vec<Conflict> {
    let mut by_package: BTreeMap<&str, (Vec<String>, BTreeSet<&Version>)> = BTreeMap::new();
    for package in allowed {
        let theirs: BTreeSet<&Version> = package
            .valids
            .get(&engine)
            .map(|v| v.iter().collect())
            .unwrap_or_default();
        let missing: Vec<&Version> = root_valid.iter().filter(|v| !theirs.contains(v)).collect();
        if missing.is_empty() {
            continue;
        }
        let (ranges, versions) = by_package.entry(package.name.as_str()).or_default();
        let range = package
            .engines
            .get(&engine)
            .cloned()
            .unwrap_or_else(|| WILDCARD.to_string());
        if !ranges.contains(&range) {
            ranges.push(range);
        }
        versions.extend(missing);
    }

    by_package
        .into_iter()
        .map(|(package, (ranges, versions))| Conflict {
            package: package.to_string(),
            ranges,
            versions: root_valid
                .iter()
                .filter(|v| versions.contains(v))
                .cloned()
                .collect(),
        })
        .collect()
}

fn omission(check: &EnginesCheck<'_>) -> Option<Omission> {
    let declared: Vec<&str> = check
        .engines
        .iter()
        .filter_map(|e| check.root_ranges.get(e).map(String::as_str))
        .collect();
    let wildcards = declared.iter().filter(|r| is_wildcard(r)).count();

    if declared.is_empty() {
        Some(Omission::AllOmitted)
    } else if declared.len() < check.engines.len() {
        Some(Omission::SomeOmitted)
    } else if wildcards == declared.len() {
        Some(Omission::AllWildcard)
    } else if wildcards > 0 {
        Some(Omission::SomeWildcard)
    } else {
        None
    }
}

fn omission_message(field: &str, omission: Omission) -> String {
    let problem = match omission {
        Omission::AllOmitted => "is missing",
        Omission::SomeOmitted => "has some of your selected engines missing",
        Omission::AllWildcard => "has your selected engines set to `*`",
        Omission::SomeWildcard => "has some of your selected engines set to `*`",
    };
    format!(
        "Your \"{}\" field {}! Prefer explicitly setting a supported engine range.",
        field, problem
    )
}

fn verdict_message(field: &str, kind: VerdictKind, engines: &[Engine]) -> String {
    let names = engines
        .iter()
        .map(Engine::key)
        .collect::<Vec<_>>()
        .join("/");
    match kind {
        VerdictKind::Exact => format!(
            "Your \"{}\" field exactly matches your dependency graph's requirements!",
            field
        ),
        VerdictKind::RootSubset => format!(
            "Your \"{}\" field allows fewer {} versions than your dependency graph does.",
            field, names
        ),
        VerdictKind::RootSuperset => format!(
            "Your \"{}\" field allows more {} versions than your dependency graph does!",
            field, names
        ),
        VerdictKind::Disjoint => format!(
            "Your \"{}\" field and your dependency graph each allow {} versions the other does not!",
            field, names
        ),
    }
}

/// Compares the root declaration with the dependency graph
///
/// Exact and RootSubset are successes; a missing or `*` root range,
/// RootSuperset and Disjoint are failures. Every outcome except Exact
/// carries the remediation that would make the root match exactly.
pub fn check_engines(check: &EnginesCheck<'_>) -> Result<EnginesOutcome, Failure> {
    let field = check.source.field();
    let graph_ranges: BTreeMap<Engine, String> = check
        .engines
        .iter()
        .map(|engine| {
            let display = check
                .graph_ranges
                .get(engine)
                .map(|r| r.display.clone())
                .unwrap_or_else(|| WILDCARD.to_string());
            (*engine, display)
        })
        .collect();
    let remediation = Remediation::new(check.source, graph_ranges.clone());

    if let Some(omission) = omission(check) {
        return Err(Failure::new(
            FailureKind::Implicit(omission),
            omission_message(field, omission),
        )
        .with_remediation(remediation));
    }

    let relations: BTreeMap<Engine, Relation> = check
        .engines
        .iter()
        .map(|engine| {
            let root = versions_of(check.root_valids, *engine);
            let graph = check.graph.versions(*engine);
            (*engine, classify_relation(root, graph))
        })
        .collect();
    let kind = verdict_kind(relations.values());

    let conflicts = if kind.is_success() {
        BTreeMap::new()
    } else {
        relations
            .iter()
            .filter(|(_, relation)| **relation != Relation::Same)
            .map(|(engine, _)| {
                let root = versions_of(check.root_valids, *engine);
                (*engine, attribute_conflicts(*engine, root, &check.graph.allowed))
            })
            .filter(|(_, list)| !list.is_empty())
            .collect()
    };

    let verdict = Verdict {
        kind,
        relations,
        graph_ranges,
        conflicts,
    };
    let message = verdict_message(field, kind, check.engines);

    match kind {
        VerdictKind::Exact => Ok(EnginesOutcome {
            verdict,
            message,
            remediation: None,
        }),
        VerdictKind::RootSubset => Ok(EnginesOutcome {
            verdict,
            message,
            remediation: Some(remediation),
        }),
        VerdictKind::RootSuperset => Err(Failure::new(FailureKind::Inexact, message)
            .with_verdict(verdict)
            .with_remediation(remediation)),
        VerdictKind::Disjoint => Err(Failure::new(FailureKind::Disjoint, message)
            .with_verdict(verdict)
            .with_remediation(remediation)),
    }
}

/// Checks that a published package's `devEngines` range stays within `engines`
pub fn check_dev_engines(
    dev_range: &str,
    dev_valid: &[Version],
    engines_range: Option<&str>,
    engines_valid: &[Version],
) -> Result<(), Failure> {
    let allowed: BTreeSet<&Version> = engines_valid.iter().collect();
    if dev_valid.iter().all(|v| allowed.contains(v)) {
        return Ok(());
    }
    Err(Failure::new(
        FailureKind::DevEngines,
        format!(
            "Your \"devEngines\" field is not a subset of your \"engines\" field! \
             \"engines.node\" allows {} but \"devEngines.runtime\" requires {}. \
             Either widen your \"engines\" field or narrow your \"devEngines\" field.",
            engines_range.unwrap_or(WILDCARD),
            dev_range
        ),
    ))
}

fn versions_of(valids: &ValidSet, engine: Engine) -> &[Version] {
    valids.get(&engine).map(Vec::as_slice).unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConstraintEntry, Range, VersionCatalog};
    use crate::reconcile::aggregate::aggregate;
    use crate::reconcile::compact::compact_graph;
    use crate::reconcile::evaluator::filter;

    const CATALOG: [&str; 8] = [
        "v14.0.0", "v14.21.0", "v16.0.0", "v16.20.0", "v18.0.0", "v18.19.0", "v20.0.0",
        "v20.10.0",
    ];

    fn catalog() -> VersionCatalog {
        VersionCatalog::new().with_engine(
            Engine::Node,
            CATALOG.iter().map(|s| Version::parse(s).unwrap()).collect(),
        )
    }

    fn valid(range: &str) -> Vec<Version> {
        filter(catalog().versions(Engine::Node), &Range::parse(range).unwrap())
    }

    fn raws(versions: &[Version]) -> Vec<&str> {
        versions.iter().map(|v| v.raw()).collect()
    }

    struct Fixture {
        root_ranges: EngineRanges,
        root_valids: ValidSet,
        graph: GraphValids,
        graph_ranges: BTreeMap<Engine, CompactRange>,
    }

    impl Fixture {
        fn new(root: Option<&str>, entries: Vec<ConstraintEntry>) -> Self {
            let catalog = catalog();
            let mut root_ranges = EngineRanges::new();
            if let Some(root) = root {
                root_ranges.insert(Engine::Node, root.to_string());
            }
            let mut root_valids = ValidSet::new();
            root_valids.insert(Engine::Node, valid(root.unwrap_or("*")));
            let graph = aggregate(&entries, &catalog).unwrap();
            let graph_ranges = compact_graph(&graph, &catalog).unwrap();
            Self {
                root_ranges,
                root_valids,
                graph,
                graph_ranges,
            }
        }

        fn check(&self) -> Result<EnginesOutcome, Failure> {
            check_engines(&EnginesCheck {
                engines: &[Engine::Node],
                source: RangeSource::Engines,
                root_ranges: &self.root_ranges,
                root_valids: &self.root_valids,
                graph: &self.graph,
                graph_ranges: &self.graph_ranges,
            })
        }
    }

    #[test]
    fn test_relation_same() {
        assert_eq!(classify_relation(&valid(">=16"), &valid(">=16")), Relation::Same);
    }

    #[test]
    fn test_relation_superset() {
        assert_eq!(classify_relation(&valid(">=14"), &valid(">=18")), Relation::Superset);
    }

    #[test]
    fn test_relation_subset() {
        assert_eq!(classify_relation(&valid(">=20"), &valid(">=18")), Relation::Subset);
    }

    #[test]
    fn test_relation_disjoint() {
        assert_eq!(classify_relation(&valid("^14 || ^16"), &valid(">=16")), Relation::Disjoint);
        assert_eq!(classify_relation(&valid("^14"), &valid("^20")), Relation::Disjoint);
    }

    #[test]
    fn test_relation_is_total() {
        let ranges = ["*", ">=14", ">=16", "^16", "^18 || ^20", "<16", "^14 || ^20"];
        for a in ranges {
            for b in ranges {
                let relation = classify_relation(&valid(a), &valid(b));
                let root: BTreeSet<_> = valid(a).into_iter().collect();
                let graph: BTreeSet<_> = valid(b).into_iter().collect();
                let expected = if root == graph {
                    Relation::Same
                } else if graph.is_subset(&root) {
                    Relation::Superset
                } else if root.is_subset(&graph) {
                    Relation::Subset
                } else {
                    Relation::Disjoint
                };
                assert_eq!(relation, expected, "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn test_verdict_kind_precedence() {
        use Relation::*;
        assert_eq!(verdict_kind(&[Same, Same]), VerdictKind::Exact);
        assert_eq!(verdict_kind(&[Same, Subset]), VerdictKind::RootSubset);
        assert_eq!(verdict_kind(&[Subset, Superset]), VerdictKind::RootSuperset);
        assert_eq!(verdict_kind(&[Superset, Disjoint]), VerdictKind::Disjoint);
    }

    #[test]
    fn test_exact() {
        let fixture = Fixture::new(
            Some(">= 16"),
            vec![ConstraintEntry::single("one", Engine::Node, ">=16")],
        );
        let outcome = fixture.check().unwrap();
        assert_eq!(outcome.verdict.kind, VerdictKind::Exact);
        assert!(outcome.message.contains("exactly matches"));
        assert!(outcome.remediation.is_none());
        assert!(outcome.verdict.conflicts.is_empty());
    }

    #[test]
    fn test_root_superset_with_conflicts() {
        let fixture = Fixture::new(
            Some(">=14"),
            vec![ConstraintEntry::single("one", Engine::Node, ">=18")],
        );
        let failure = fixture.check().unwrap_err();
        assert_eq!(failure.kind, FailureKind::Inexact);
        assert!(failure.message.contains("more"));

        let verdict = failure.verdict.unwrap();
        assert_eq!(verdict.kind, VerdictKind::RootSuperset);
        let conflicts = &verdict.conflicts[&Engine::Node];
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].package, "one");
        assert_eq!(conflicts[0].ranges, vec![">=18".to_string()]);
        let mut offending = raws(&conflicts[0].versions);
        offending.sort();
        assert_eq!(offending, vec!["v14.0.0", "v14.21.0", "v16.0.0", "v16.20.0"]);

        let remediation = failure.remediation.unwrap();
        assert_eq!(remediation.ranges[&Engine::Node], ">=18");
    }

    #[test]
    fn test_root_subset_is_success_with_remediation() {
        let fixture = Fixture::new(
            Some(">=20"),
            vec![ConstraintEntry::single("one", Engine::Node, ">=18")],
        );
        let outcome = fixture.check().unwrap();
        assert_eq!(outcome.verdict.kind, VerdictKind::RootSubset);
        assert!(outcome.message.contains("fewer"));
        assert_eq!(outcome.remediation.unwrap().ranges[&Engine::Node], ">=18");
    }

    #[test]
    fn test_unconstraining_graph_suggests_floor_not_wildcard() {
        let entries = vec![ConstraintEntry::single("dep", Engine::Node, ">=14")];
        let outcome = Fixture::new(Some(">=16"), entries.clone()).check().unwrap();
        assert_eq!(outcome.verdict.kind, VerdictKind::RootSubset);
        let suggested = outcome.remediation.unwrap().ranges[&Engine::Node].clone();
        assert_eq!(suggested, ">=14");

        let widened = Fixture::new(Some(suggested.as_str()), entries).check().unwrap();
        assert_eq!(widened.verdict.kind, VerdictKind::Exact);
    }

    #[test]
    fn test_disjoint_is_its_own_failure() {
        let fixture = Fixture::new(
            Some("^14 || ^16"),
            vec![ConstraintEntry::single("one", Engine::Node, ">=16")],
        );
        let failure = fixture.check().unwrap_err();
        assert_eq!(failure.kind, FailureKind::Disjoint);
        let verdict = failure.verdict.unwrap();
        assert_eq!(verdict.kind, VerdictKind::Disjoint);
        assert_eq!(verdict.relations[&Engine::Node], Relation::Disjoint);
        let conflicts = &verdict.conflicts[&Engine::Node];
        assert_eq!(raws(&conflicts[0].versions), vec!["v14.21.0", "v14.0.0"]);
    }

    #[test]
    fn test_implicit_all_omitted() {
        let fixture = Fixture::new(None, vec![ConstraintEntry::single("one", Engine::Node, ">=18")]);
        let failure = fixture.check().unwrap_err();
        assert_eq!(failure.kind, FailureKind::Implicit(Omission::AllOmitted));
        assert!(failure.message.contains("missing"));
        assert_eq!(failure.remediation.unwrap().ranges[&Engine::Node], ">=18");
    }

    #[test]
    fn test_implicit_wildcard() {
        let fixture = Fixture::new(Some("*"), vec![]);
        let failure = fixture.check().unwrap_err();
        assert_eq!(failure.kind, FailureKind::Implicit(Omission::AllWildcard));
        assert!(failure.message.contains("`*`"));
    }

    #[test]
    fn test_implicit_partial_omission() {
        let root_ranges: EngineRanges = [(Engine::Node, ">=16".to_string())].into_iter().collect();
        let valids = ValidSet::new();
        let graph = GraphValids::default();
        let graph_ranges = BTreeMap::new();
        let failure = check_engines(&EnginesCheck {
            engines: &[Engine::Node, Engine::Npm],
            source: RangeSource::Engines,
            root_ranges: &root_ranges,
            root_valids: &valids,
            graph: &graph,
            graph_ranges: &graph_ranges,
        })
        .unwrap_err();
        assert_eq!(failure.kind, FailureKind::Implicit(Omission::SomeOmitted));
        assert!(failure.message.contains("some of your selected engines missing"));
    }

    #[test]
    fn test_implicit_partial_wildcard() {
        let root_ranges: EngineRanges = [
            (Engine::Node, ">=16".to_string()),
            (Engine::Npm, "*".to_string()),
        ]
        .into_iter()
        .collect();
        let valids = ValidSet::new();
        let graph = GraphValids::default();
        let graph_ranges = BTreeMap::new();
        let failure = check_engines(&EnginesCheck {
            engines: &[Engine::Node, Engine::Npm],
            source: RangeSource::Engines,
            root_ranges: &root_ranges,
            root_valids: &valids,
            graph: &graph,
            graph_ranges: &graph_ranges,
        })
        .unwrap_err();
        assert_eq!(failure.kind, FailureKind::Implicit(Omission::SomeWildcard));
    }

    #[test]
    fn test_conflicts_grouped_and_sorted() {
        let entries = vec![
            ConstraintEntry::single("zeta", Engine::Node, ">=20"),
            ConstraintEntry::single("alpha", Engine::Node, ">=18"),
            ConstraintEntry::single("alpha", Engine::Node, ">=16"),
            ConstraintEntry::single("alpha", Engine::Node, ">=18"),
            ConstraintEntry::single("fine", Engine::Node, ">=14"),
        ];
        let graph = aggregate(&entries, &catalog()).unwrap();
        let conflicts = attribute_conflicts(Engine::Node, &valid(">=14"), &graph.allowed);

        let names: Vec<_> = conflicts.iter().map(|c| c.package.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert_eq!(conflicts[0].ranges, vec![">=18".to_string(), ">=16".to_string()]);
        assert_eq!(
            raws(&conflicts[0].versions),
            vec!["v16.20.0", "v16.0.0", "v14.21.0", "v14.0.0"]
        );
        assert_eq!(conflicts[1].versions.len(), 6);
    }

    #[test]
    fn test_dev_engines_subset_ok() {
        assert!(check_dev_engines("^20", &valid("^20"), Some(">=18"), &valid(">=18")).is_ok());
    }

    #[test]
    fn test_dev_engines_not_subset() {
        let failure =
            check_dev_engines(">=14", &valid(">=14"), Some(">=18"), &valid(">=18")).unwrap_err();
        assert_eq!(failure.kind, FailureKind::DevEngines);
        assert!(failure.message.contains("not a subset"));
        assert!(failure.message.contains(">=14"));
    }
}
