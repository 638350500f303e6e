//! Virtual tree loaded from `package-lock.json` / `npm-shrinkwrap.json`
//!
//! Only lockfile versions 2 and 3 carry the `packages` map this reads.

use super::{GraphNode, GraphWalker, NodeFlags, TreeMode};
use crate::error::GraphError;
use crate::manifest::engine_ranges;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Lockfiles in order of precedence
const LOCKFILES: &[&str] = &["npm-shrinkwrap.json", "package-lock.json"];

const NODE_MODULES_SEGMENT: &str = "node_modules/";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Lockfile {
    #[serde(default)]
    lockfile_version: u32,
    #[serde(default)]
    packages: BTreeMap<String, LockEntry>,
}

/// One entry of the lockfile `packages` map
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub engines: Option<Value>,
    #[serde(default)]
    pub dev: bool,
    #[serde(default)]
    pub peer: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub in_bundle: bool,
    /// Symlink to a workspace folder; the folder has its own entry
    #[serde(default)]
    pub link: bool,
}

impl LockEntry {
    pub fn flags(&self) -> NodeFlags {
        NodeFlags {
            dev: self.dev,
            peer: self.peer,
            optional: self.optional,
        }
    }

    /// Package name, from the `name` field or the install location
    pub fn package_name(&self, location: &str) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        location
            .rsplit_once(NODE_MODULES_SEGMENT)
            .map(|(_, name)| name)
            .unwrap_or(location)
            .to_string()
    }

    fn into_node(self, location: &str) -> GraphNode {
        GraphNode {
            name: self.package_name(location),
            engines: self.engines.as_ref().map(engine_ranges).unwrap_or_default(),
            flags: self.flags(),
            in_bundle: self.in_bundle,
            version: self.version,
        }
    }
}

/// Finds the lockfile of a project, preferring `npm-shrinkwrap.json`
pub fn find_lockfile(dir: &Path) -> Option<PathBuf> {
    LOCKFILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Parses the `packages` map of a lockfile, keyed by install location
///
/// The root entry (`""`) is included; callers skip it.
pub fn parse_lockfile(path: &Path, content: &str) -> Result<BTreeMap<String, LockEntry>, GraphError> {
    let lockfile: Lockfile = serde_json::from_str(content)
        .map_err(|e| GraphError::lockfile_parse(path, e.to_string()))?;
    if lockfile.lockfile_version < 2 && lockfile.packages.is_empty() {
        return Err(GraphError::lockfile_parse(
            path,
            format!(
                "lockfile version {} is not supported; run `npm install` to upgrade it",
                lockfile.lockfile_version
            ),
        ));
    }
    Ok(lockfile.packages)
}

/// Walker over the project's lockfile
pub struct VirtualTree {
    dir: PathBuf,
}

impl VirtualTree {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl GraphWalker for VirtualTree {
    fn mode(&self) -> TreeMode {
        TreeMode::Virtual
    }

    async fn nodes(&self) -> Result<Vec<GraphNode>, GraphError> {
        let path = find_lockfile(&self.dir).ok_or_else(|| GraphError::MissingLockfile {
            path: self.dir.clone(),
        })?;
        debug!("reading lockfile {}", path.display());
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| GraphError::io(&path, e))?;

        Ok(parse_lockfile(&path, &content)?
            .into_iter()
            .filter(|(location, entry)| !location.is_empty() && !entry.link)
            .map(|(location, entry)| entry.into_node(&location))
            .collect())
    }
}
