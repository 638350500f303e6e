//! Root manifest reading and writing
//!
//! This module provides functionality to:
//! - Read the root package.json and resolve its declared engine ranges
//! - Extract `engines` ranges from any package.json-shaped value
//! - Write remediations back to package.json

mod package_json;
mod writer;

pub use package_json::{
    engine_ranges, read_manifest, RootManifest, RootRanges, RuntimeEntry, MANIFEST_FILENAME,
};
pub use writer::{apply_remediation, save_remediation};
