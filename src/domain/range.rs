//! npm-style semver range expressions
//!
//! Supports the grammar used in `engines` fields:
//! - Comparators: `>=16`, `>= 16.0.0`, `<20`, `<=1.2.3`, `>1`, `=1.2.3`
//! - Caret and tilde: `^16.2`, `~1.2.3`
//! - X-ranges: `*`, `16`, `16.x`, `16.2.*`
//! - Hyphen ranges: `14 - 18`
//! - Unions: `^14 || ^16 || >=18`
//!
//! Whitespace separates comparators inside a group (logical AND), `||`
//! separates groups (logical OR).

use crate::domain::Version;
use crate::error::RangeError;
use regex::Regex;
use semver::Prerelease;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// The token that matches every version
pub const WILDCARD: &str = "*";

static HYPHEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\S+)\s+-\s+(\S+)\s*$").unwrap());
static OP_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(<=|>=|<|>|=|\^|~>?)\s+").unwrap());
static PARTIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(<=|>=|<|>|=|\^|~>?)?[vV=]?(\d+|[xX*])?(?:\.(\d+|[xX*]))?(?:\.(\d+|[xX*]))?(?:-([0-9A-Za-z.-]+))?(?:\+[0-9A-Za-z.-]+)?$",
    )
    .unwrap()
});

/// Comparison operator of a single comparator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

/// A single `op version` predicate
#[derive(Debug, Clone, PartialEq, Eq)]
struct Comparator {
    op: Op,
    version: semver::Version,
}

impl Comparator {
    fn new(op: Op, version: semver::Version) -> Self {
        Self { op, version }
    }

    /// A comparator no version can satisfy
    fn nothing() -> Self {
        let mut floor = semver::Version::new(0, 0, 0);
        floor.pre = Prerelease::new("0").unwrap_or_default();
        Self::new(Op::Lt, floor)
    }

    fn matches(&self, version: &semver::Version) -> bool {
        match self.op {
            Op::Lt => version < &self.version,
            Op::Le => version <= &self.version,
            Op::Gt => version > &self.version,
            Op::Ge => version >= &self.version,
            Op::Eq => version == &self.version,
        }
    }
}

/// A partially specified version such as `16`, `16.x` or `16.2.0-rc.1`
#[derive(Debug, Clone, Default)]
struct Partial {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    pre: Option<String>,
}

impl Partial {
    fn is_any(&self) -> bool {
        self.major.is_none()
    }

    /// The lowest version the partial can denote
    fn floor(&self) -> semver::Version {
        let mut v = semver::Version::new(
            self.major.unwrap_or(0),
            self.minor.unwrap_or(0),
            self.patch.unwrap_or(0),
        );
        if self.patch.is_some() {
            if let Some(pre) = self.pre.as_deref().and_then(|p| Prerelease::new(p).ok()) {
                v.pre = pre;
            }
        }
        v
    }

    /// The first version past everything the partial denotes
    fn ceiling(&self) -> Option<semver::Version> {
        match (self.major, self.minor, self.patch) {
            (None, _, _) => None,
            (Some(major), None, _) => Some(semver::Version::new(major.saturating_add(1), 0, 0)),
            (Some(major), Some(minor), None) => {
                Some(semver::Version::new(major, minor.saturating_add(1), 0))
            }
            (Some(_), Some(_), Some(_)) => None,
        }
    }

    fn is_full(&self) -> bool {
        self.patch.is_some()
    }
}

/// A parsed semver range expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Range {
    raw: String,
    /// OR of AND-groups; an empty group matches everything
    sets: Vec<Vec<Comparator>>,
}

impl Range {
    /// Parses a range expression
    pub fn parse(raw: &str) -> Result<Self, RangeError> {
        let trimmed = raw.trim();
        let mut sets = Vec::new();
        for group in trimmed.split("||") {
            sets.push(parse_group(group).map_err(|message| RangeError::invalid_range(raw, message))?);
        }
        Ok(Self {
            raw: trimmed.to_string(),
            sets,
        })
    }

    /// The range that matches every version
    pub fn any() -> Self {
        Self {
            raw: WILDCARD.to_string(),
            sets: vec![Vec::new()],
        }
    }

    /// The expression as written
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Returns true if the expression is the wildcard token (or empty)
    pub fn is_wildcard(&self) -> bool {
        is_wildcard(&self.raw)
    }

    /// Tests whether a version satisfies the range
    pub fn test(&self, version: &Version) -> bool {
        let v = version.semver();
        self.sets.iter().any(|set| set_matches(set, v))
    }
}

/// Returns true if a range string is the wildcard token (or empty)
pub fn is_wildcard(raw: &str) -> bool {
    matches!(raw.trim(), "" | "*" | "x" | "X")
}

fn set_matches(set: &[Comparator], version: &semver::Version) -> bool {
    if !set.iter().all(|c| c.matches(version)) {
        return false;
    }
    if version.pre.is_empty() {
        return true;
    }
    // Prereleases only match when a comparator opts into the same release line
    set.iter().any(|c| {
        !c.version.pre.is_empty()
            && c.version.major == version.major
            && c.version.minor == version.minor
            && c.version.patch == version.patch
    })
}

fn parse_group(group: &str) -> Result<Vec<Comparator>, String> {
    let group = group.trim();
    if group.is_empty() {
        return Ok(Vec::new());
    }

    if let Some(caps) = HYPHEN_RE.captures(group) {
        let from = parse_partial(&caps[1])?;
        let to = parse_partial(&caps[2])?;
        return Ok(hyphen(&from.1, &to.1));
    }

    let normalized = OP_SPACE_RE.replace_all(group, "$1");
    let mut comparators = Vec::new();
    for token in normalized.split_whitespace() {
        let (op, partial) = parse_partial(token)?;
        comparators.extend(desugar(op, &partial));
    }
    Ok(comparators)
}

fn parse_partial(token: &str) -> Result<(String, Partial), String> {
    let caps = PARTIAL_RE
        .captures(token)
        .ok_or_else(|| format!("invalid comparator '{}'", token))?;

    let op = caps.get(1).map(|m| m.as_str()).unwrap_or("").to_string();
    let number = |idx: usize| -> Result<Option<u64>, String> {
        match caps.get(idx).map(|m| m.as_str()) {
            None | Some("x") | Some("X") | Some("*") => Ok(None),
            Some(n) => n
                .parse()
                .map(Some)
                .map_err(|_| format!("version number too large in '{}'", token)),
        }
    };

    let major = number(2)?;
    let mut minor = number(3)?;
    let mut patch = number(4)?;
    if major.is_none() && !op.is_empty() && caps.get(2).is_none() {
        return Err(format!("missing version after '{}'", op));
    }
    // Anything after a wildcard component is ignored
    if major.is_none() {
        minor = None;
        patch = None;
    } else if minor.is_none() {
        patch = None;
    }
    let pre = caps.get(5).map(|m| m.as_str().to_string());

    Ok((
        op,
        Partial {
            major,
            minor,
            patch,
            pre,
        },
    ))
}

fn desugar(op: String, p: &Partial) -> Vec<Comparator> {
    match op.as_str() {
        "^" => caret(p),
        "~" | "~>" => tilde(p),
        "" | "=" => x_range(p),
        ">=" => {
            if p.is_any() {
                Vec::new()
            } else {
                vec![Comparator::new(Op::Ge, p.floor())]
            }
        }
        ">" => {
            if p.is_any() {
                vec![Comparator::nothing()]
            } else if p.is_full() {
                vec![Comparator::new(Op::Gt, p.floor())]
            } else {
                p.ceiling()
                    .map(|c| vec![Comparator::new(Op::Ge, c)])
                    .unwrap_or_default()
            }
        }
        "<" => {
            if p.is_any() {
                vec![Comparator::nothing()]
            } else {
                vec![Comparator::new(Op::Lt, p.floor())]
            }
        }
        "<=" => {
            if p.is_any() {
                Vec::new()
            } else if p.is_full() {
                vec![Comparator::new(Op::Le, p.floor())]
            } else {
                p.ceiling()
                    .map(|c| vec![Comparator::new(Op::Lt, c)])
                    .unwrap_or_default()
            }
        }
        _ => vec![Comparator::nothing()],
    }
}

fn x_range(p: &Partial) -> Vec<Comparator> {
    if p.is_any() {
        return Vec::new();
    }
    if p.is_full() {
        return vec![Comparator::new(Op::Eq, p.floor())];
    }
    let mut out = vec![Comparator::new(Op::Ge, p.floor())];
    if let Some(ceiling) = p.ceiling() {
        out.push(Comparator::new(Op::Lt, ceiling));
    }
    out
}

fn caret(p: &Partial) -> Vec<Comparator> {
    let Some(major) = p.major else {
        return Vec::new();
    };
    let upper = match (major, p.minor, p.patch) {
        (0, None, _) => semver::Version::new(1, 0, 0),
        (0, Some(0), None) => semver::Version::new(0, 1, 0),
        (0, Some(0), Some(patch)) => semver::Version::new(0, 0, patch.saturating_add(1)),
        (0, Some(minor), _) => semver::Version::new(0, minor.saturating_add(1), 0),
        (major, _, _) => semver::Version::new(major.saturating_add(1), 0, 0),
    };
    vec![
        Comparator::new(Op::Ge, p.floor()),
        Comparator::new(Op::Lt, upper),
    ]
}

fn tilde(p: &Partial) -> Vec<Comparator> {
    let Some(major) = p.major else {
        return Vec::new();
    };
    let upper = match p.minor {
        None => semver::Version::new(major.saturating_add(1), 0, 0),
        Some(minor) => semver::Version::new(major, minor.saturating_add(1), 0),
    };
    vec![
        Comparator::new(Op::Ge, p.floor()),
        Comparator::new(Op::Lt, upper),
    ]
}

fn hyphen(from: &Partial, to: &Partial) -> Vec<Comparator> {
    let mut out = Vec::new();
    if !from.is_any() {
        out.push(Comparator::new(Op::Ge, from.floor()));
    }
    if !to.is_any() {
        if to.is_full() {
            out.push(Comparator::new(Op::Le, to.floor()));
        } else if let Some(ceiling) = to.ceiling() {
            out.push(Comparator::new(Op::Lt, ceiling));
        }
    }
    out
}

/// A range compacted from a valid set, with its human-facing form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompactRange {
    /// The range whose semantics reproduce the valid set
    pub range: Range,
    /// Display form with trailing `.0` components stripped
    pub display: String,
}

impl CompactRange {
    pub fn new(range: Range, display: impl Into<String>) -> Self {
        Self {
            range,
            display: display.into(),
        }
    }

    /// The compaction of "no constraint"
    pub fn any() -> Self {
        Self::new(Range::any(), WILDCARD)
    }
}

impl fmt::Display for CompactRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl Default for Range {
    fn default() -> Self {
        Self::any()
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Range {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Range::parse(s)
    }
}

impl Serialize for Range {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Range {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Range::parse(&raw).map_err(serde::de::Error::custom)
    }
}
