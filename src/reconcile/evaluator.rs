//! Range satisfaction and filtering over version lists

use crate::domain::{Range, Version};
use crate::error::RangeError;

/// Parses an optional manifest range, treating a missing value as `*`
pub fn parse_range(raw: Option<&str>) -> Result<Range, RangeError> {
    match raw {
        Some(raw) => Range::parse(raw),
        None => Ok(Range::any()),
    }
}

/// Returns true if the version satisfies the range
pub fn satisfies(version: &Version, range: &Range) -> bool {
    range.test(version)
}

/// Keeps the versions satisfying the range, preserving input order
pub fn filter(versions: &[Version], range: &Range) -> Vec<Version> {
    if range.is_wildcard() {
        // `*` never admits a prerelease
        return versions
            .iter()
            .filter(|v| !v.is_prerelease())
            .cloned()
            .collect();
    }
    versions
        .iter()
        .filter(|v| satisfies(v, range))
        .cloned()
        .collect()
}

/// Parses `raw` and filters the versions with it
pub fn filter_str(versions: &[Version], raw: Option<&str>) -> Result<Vec<Version>, RangeError> {
    let range = parse_range(raw)?;
    Ok(filter(versions, &range))
}
