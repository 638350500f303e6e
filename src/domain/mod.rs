//! Core domain models for enginefit
//!
//! This module contains the fundamental types used throughout the application:
//! - Engine identifiers (node, npm)
//! - Versions and npm-style range expressions
//! - Per-package constraints collected from the dependency graph
//! - Version catalogs and valid-version sets
//! - Verdicts, failures and remediations

mod catalog;
mod constraint;
mod engine;
mod range;
mod verdict;
mod version;

pub use catalog::{sort_descending, ValidSet, VersionCatalog};
pub use constraint::{canonicalize, ConstraintEntry, EngineRanges};
pub use engine::Engine;
pub use range::{is_wildcard, CompactRange, Range, WILDCARD};
pub use verdict::{
    Conflict, Conflicts, Failure, FailureKind, Omission, RangeSource, Relation, Remediation,
    Verdict, VerdictKind,
};
pub use version::Version;
