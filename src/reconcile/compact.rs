//! Compaction of valid-version lists into minimal range expressions
//!
//! The compactor groups versions by caret compatibility, emits one
//! `^major.minor` clause per group, and prefers a single `>=major.minor`
//! clause when it selects exactly the same catalog versions.

use super::evaluator::filter;
use super::aggregate::GraphValids;
use crate::domain::{CompactRange, Engine, Range, ValidSet, Version, VersionCatalog};
use crate::error::CompactError;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static TRAILING_ZERO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\.0)+( |$)").unwrap());

/// Strips trailing `.0` components (`>=16.0` → `>=16`)
pub fn display_range(raw: &str) -> String {
    TRAILING_ZERO_RE.replace_all(raw, "${1}").into_owned()
}

/// Compacts one engine's valid versions (newest first) against its catalog
pub fn compact(
    engine: Engine,
    valid: &[Version],
    catalog: &[Version],
) -> Result<CompactRange, CompactError> {
    let unsound = |range: &str| CompactError::Unsound {
        engine,
        versions: valid
            .iter()
            .map(Version::raw)
            .collect::<Vec<_>>()
            .join(","),
        range: range.to_string(),
    };

    if valid.is_empty() {
        return Ok(CompactRange::any());
    }

    let groups = group_by_caret(valid, &unsound)?;
    let clauses: Vec<String> = groups
        .iter()
        .map(|anchor| format!("^{}.{}", anchor.major(), anchor.minor()))
        .collect();
    let multi = clauses.join(" || ");

    let lowest = &groups[0];
    let single = format!(">={}.{}", lowest.major(), lowest.minor());
    let single_range = Range::parse(&single).map_err(|_| unsound(&single))?;

    let chosen = if filter(catalog, &single_range) == valid {
        single_range
    } else {
        Range::parse(&multi).map_err(|_| unsound(&multi))?
    };

    let display = display_range(chosen.raw());
    if !valid.iter().all(|v| chosen.test(v)) {
        return Err(unsound(&display));
    }
    Ok(CompactRange::new(chosen, display))
}

/// Compacts every engine of a valid set
pub fn compact_all(
    valids: &ValidSet,
    catalog: &VersionCatalog,
) -> Result<BTreeMap<Engine, CompactRange>, CompactError> {
    valids
        .iter()
        .map(|(engine, valid)| {
            compact(*engine, valid, catalog.versions(*engine)).map(|range| (*engine, range))
        })
        .collect()
}

/// Compacts the aggregated graph; only a graph without entries is `*`
pub fn compact_graph(
    graph: &GraphValids,
    catalog: &VersionCatalog,
) -> Result<BTreeMap<Engine, CompactRange>, CompactError> {
    if graph.allowed.is_empty() {
        return Ok(graph
            .valids
            .keys()
            .map(|engine| (*engine, CompactRange::any()))
            .collect());
    }
    compact_all(&graph.valids, catalog)
}

/// Group anchors (lowest version of each group), oldest first
fn group_by_caret<'a>(
    valid: &'a [Version],
    unsound: &dyn Fn(&str) -> CompactError,
) -> Result<Vec<&'a Version>, CompactError> {
    let mut anchors: Vec<&Version> = Vec::new();
    let mut caret: Option<Range> = None;
    for version in valid.iter().rev() {
        let joins = caret.as_ref().is_some_and(|range| range.test(version));
        if !joins {
            let anchor = format!("^{}", version.semver());
            caret = Some(Range::parse(&anchor).map_err(|_| unsound(&anchor))?);
            anchors.push(version);
        }
    }
    Ok(anchors)
}
