//! Actual tree read from `node_modules` on disk

use super::virtual_tree::{parse_lockfile, LockEntry};
use super::{GraphNode, GraphWalker, TreeMode, NODE_MODULES};
use crate::error::GraphError;
use crate::manifest::{engine_ranges, MANIFEST_FILENAME};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// npm's record of the installed tree
const HIDDEN_LOCKFILE: &str = ".package-lock.json";

/// Walker over an installed `node_modules`
pub struct ActualTree {
    dir: PathBuf,
}

impl ActualTree {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl GraphWalker for ActualTree {
    fn mode(&self) -> TreeMode {
        TreeMode::Actual
    }

    async fn nodes(&self) -> Result<Vec<GraphNode>, GraphError> {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || read_installed(&dir))
            .await
            .map_err(|e| GraphError::Walker {
                message: e.to_string(),
            })?
    }
}

/// Reads every installed package below `dir/node_modules`
fn read_installed(dir: &Path) -> Result<Vec<GraphNode>, GraphError> {
    let node_modules = dir.join(NODE_MODULES);
    if !node_modules.is_dir() {
        return Err(GraphError::MissingNodeModules {
            path: dir.to_path_buf(),
        });
    }

    let hidden = read_hidden_lockfile(&node_modules)?;
    let mut nodes = Vec::new();
    walk_node_modules(&node_modules, NODE_MODULES, &hidden, &mut nodes)?;
    Ok(nodes)
}

/// Flags recorded by npm; a missing or broken hidden lockfile yields none
fn read_hidden_lockfile(node_modules: &Path) -> Result<BTreeMap<String, LockEntry>, GraphError> {
    let path = node_modules.join(HIDDEN_LOCKFILE);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("no hidden lockfile; treating installed packages as production");
            return Ok(BTreeMap::new());
        }
        Err(e) => return Err(GraphError::io(&path, e)),
    };
    match parse_lockfile(&path, &content) {
        Ok(entries) => Ok(entries),
        Err(e) => {
            debug!("ignoring hidden lockfile: {}", e);
            Ok(BTreeMap::new())
        }
    }
}

/// Collects the packages of one `node_modules` folder, then their nested ones
///
/// `location` is the lockfile-style path of the folder, always `/`-separated.
fn walk_node_modules(
    folder: &Path,
    location: &str,
    hidden: &BTreeMap<String, LockEntry>,
    nodes: &mut Vec<GraphNode>,
) -> Result<(), GraphError> {
    for (name, path) in list_dir(folder)? {
        if name.starts_with('.') {
            continue;
        }
        if name.starts_with('@') {
            for (scoped, scoped_path) in list_dir(&path)? {
                let full_name = format!("{}/{}", name, scoped);
                read_package(&scoped_path, &full_name, location, hidden, nodes)?;
            }
        } else {
            read_package(&path, &name, location, hidden, nodes)?;
        }
    }
    Ok(())
}

fn read_package(
    path: &Path,
    folder_name: &str,
    parent_location: &str,
    hidden: &BTreeMap<String, LockEntry>,
    nodes: &mut Vec<GraphNode>,
) -> Result<(), GraphError> {
    let manifest_path = path.join(MANIFEST_FILENAME);
    let content = match fs::read_to_string(&manifest_path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(GraphError::io(&manifest_path, e)),
    };
    let Ok(manifest) = serde_json::from_str::<Value>(&content) else {
        debug!("skipping unreadable {}", manifest_path.display());
        return Ok(());
    };

    let location = format!("{}/{}", parent_location, folder_name);
    let recorded = hidden.get(&location);
    nodes.push(GraphNode {
        name: manifest
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(folder_name)
            .to_string(),
        version: manifest
            .get("version")
            .and_then(Value::as_str)
            .map(String::from),
        engines: manifest.get("engines").map(engine_ranges).unwrap_or_default(),
        flags: recorded.map(LockEntry::flags).unwrap_or_default(),
        in_bundle: recorded.is_some_and(|entry| entry.in_bundle),
    });

    // Linked packages live elsewhere and are not part of this tree
    let is_link = fs::symlink_metadata(path)
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false);
    let nested = path.join(NODE_MODULES);
    if !is_link && nested.is_dir() {
        walk_node_modules(&nested, &format!("{}/{}", location, NODE_MODULES), hidden, nodes)?;
    }
    Ok(())
}

/// Directory entries sorted by name
fn list_dir(dir: &Path) -> Result<Vec<(String, PathBuf)>, GraphError> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| GraphError::io(dir, e))? {
        let entry = entry.map_err(|e| GraphError::io(dir, e))?;
        if !entry.path().is_dir() {
            continue;
        }
        entries.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
    }
    entries.sort();
    Ok(entries)
}
