//! Version-range reconciliation
//!
//! This module provides:
//! - Range evaluation over version lists
//! - Aggregation of dependency-graph constraints into valid sets
//! - Compaction of valid sets into minimal display ranges
//! - Classification of the root declaration against the graph
//! - Latest-major summaries and the current-version check
//!
//! Everything here is synchronous and free of I/O.

pub mod aggregate;
pub mod classify;
pub mod compact;
pub mod current;
pub mod evaluator;
pub mod majors;

pub use aggregate::{aggregate, GraphValids, PackageValids};
pub use classify::{
    attribute_conflicts, check_dev_engines, check_engines, classify_relation, verdict_kind,
    EnginesCheck, EnginesOutcome,
};
pub use compact::{compact, compact_all, compact_graph, display_range};
pub use current::{check_current, CurrentReport, CurrentRow};
pub use evaluator::{filter, filter_str, parse_range, satisfies};
pub use majors::{latest_engine_majors, latest_majors, EngineMajors};
