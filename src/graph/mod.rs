//! Dependency graph loading
//!
//! This module provides:
//! - Tree mode selection (`node_modules`, lockfile or registry resolution)
//! - Walkers producing the nodes of the installed, locked or ideal tree
//! - Selection of the nodes whose `engines` constrain the check

mod actual;
mod ideal;
mod virtual_tree;

pub use actual::ActualTree;
pub use ideal::{IdealTree, DEFAULT_CONCURRENCY};
pub use virtual_tree::{find_lockfile, parse_lockfile, LockEntry, VirtualTree};

use crate::domain::{canonicalize, ConstraintEntry, Engine, EngineRanges};
use crate::error::GraphError;
use crate::manifest::RootManifest;
use crate::registry::PackageRegistry;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Directory holding the installed tree
pub const NODE_MODULES: &str = "node_modules";

/// How the dependency tree is obtained
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TreeMode {
    /// Pick the best available source
    #[default]
    Auto,
    /// Read `node_modules` from disk
    Actual,
    /// Read the lockfile
    Virtual,
    /// Resolve `package.json` against the registry
    Ideal,
}

impl fmt::Display for TreeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TreeMode::Auto => "auto",
            TreeMode::Actual => "actual",
            TreeMode::Virtual => "virtual",
            TreeMode::Ideal => "ideal",
        };
        write!(f, "{}", name)
    }
}

/// Which kinds of dependencies take part in the check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphOptions {
    pub dev: bool,
    pub production: bool,
    pub peer: bool,
    /// Engines whose ranges are collected
    pub engines: Vec<Engine>,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            dev: false,
            production: true,
            peer: true,
            engines: Engine::all().to_vec(),
        }
    }
}

/// Dependency-type flags of a tree node
///
/// A flag is set only when every path from the root carries it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeFlags {
    pub dev: bool,
    pub peer: bool,
    pub optional: bool,
}

impl NodeFlags {
    /// Flags of a node reachable through both paths
    pub fn merge(self, other: NodeFlags) -> NodeFlags {
        NodeFlags {
            dev: self.dev && other.dev,
            peer: self.peer && other.peer,
            optional: self.optional && other.optional,
        }
    }
}

/// A package in the dependency tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphNode {
    pub name: String,
    pub version: Option<String>,
    /// Object-form `engines`; absent or legacy array form leaves this empty
    pub engines: EngineRanges,
    pub flags: NodeFlags,
    /// Shipped inside another package's tarball
    pub in_bundle: bool,
}

impl GraphNode {
    pub fn new(name: impl Into<String>, engines: EngineRanges) -> Self {
        Self {
            name: name.into(),
            engines,
            ..Default::default()
        }
    }

    pub fn with_flags(mut self, flags: NodeFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Returns true if the node takes part under the given options
    fn included_by(&self, options: &GraphOptions) -> bool {
        let NodeFlags { dev, peer, .. } = self.flags;
        (options.dev || !dev) && (options.production || dev) && (options.peer || !peer)
    }
}

/// Trait for sources of the dependency tree
#[async_trait]
pub trait GraphWalker: Send + Sync {
    /// The concrete mode this walker implements
    fn mode(&self) -> TreeMode;

    /// Every non-root node of the tree
    async fn nodes(&self) -> Result<Vec<GraphNode>, GraphError>;
}

/// Keeps the nodes whose `engines` constrain a selected engine
///
/// Bundled nodes and nodes excluded by the dependency-kind options are
/// dropped; the result is deduplicated and sorted by name, then node range.
pub fn select_entries(nodes: &[GraphNode], options: &GraphOptions) -> Vec<ConstraintEntry> {
    let entries = nodes
        .iter()
        .filter(|node| !node.in_bundle && !node.engines.is_empty())
        .filter(|node| node.included_by(options))
        .map(|node| ConstraintEntry::new(node.name.clone(), node.engines.clone()))
        .filter(|entry| entry.constrains_any(&options.engines))
        .collect();
    canonicalize(entries)
}

/// Loads a tree and returns its constraint entries
pub async fn walk(
    walker: &dyn GraphWalker,
    options: &GraphOptions,
) -> Result<Vec<ConstraintEntry>, GraphError> {
    let nodes = walker.nodes().await?;
    let entries = select_entries(&nodes, options);
    info!(
        "{} of {} {} tree nodes constrain the engines",
        entries.len(),
        nodes.len(),
        walker.mode()
    );
    Ok(entries)
}

/// Picks the concrete mode for a project directory
///
/// `Auto` prefers an installed `node_modules`, then a lockfile, then
/// resolution from the registry. Explicit modes are kept as given.
pub fn resolve_mode(dir: &Path, mode: TreeMode) -> TreeMode {
    let has_node_modules = dir.join(NODE_MODULES).is_dir();
    let has_lockfile = find_lockfile(dir).is_some();

    let resolved = match mode {
        TreeMode::Auto if has_node_modules => TreeMode::Actual,
        TreeMode::Auto if has_lockfile => TreeMode::Virtual,
        TreeMode::Auto => TreeMode::Ideal,
        explicit => explicit,
    };

    let mut reasons = Vec::new();
    match resolved {
        TreeMode::Actual => {
            if has_node_modules {
                reasons.push("`node_modules` found".to_string());
            }
            if mode == TreeMode::Actual {
                reasons.push("mode is \"actual\"".to_string());
            }
            info!("{}; loading tree from disk...", reasons.join(", "));
        }
        TreeMode::Virtual => {
            if has_lockfile {
                reasons.push("lockfile found".to_string());
            }
            if mode == TreeMode::Virtual {
                reasons.push("mode is \"virtual\"".to_string());
            }
            info!("{}; loading virtual tree from lockfile...", reasons.join(", "));
        }
        TreeMode::Ideal | TreeMode::Auto => {
            reasons.push("`package.json` found".to_string());
            if mode == TreeMode::Ideal {
                reasons.push("mode is \"ideal\"".to_string());
            }
            info!("{}; building ideal tree from package.json...", reasons.join(", "));
        }
    }
    resolved
}

/// Settings for building a walker
pub struct WalkerConfig {
    pub dir: PathBuf,
    pub mode: TreeMode,
    /// Maximum concurrent registry requests for the ideal tree
    pub concurrency: usize,
}

/// Create the walker for a project
pub fn create_walker(
    config: &WalkerConfig,
    manifest: &RootManifest,
    registry: Arc<dyn PackageRegistry>,
) -> Box<dyn GraphWalker> {
    match resolve_mode(&config.dir, config.mode) {
        TreeMode::Actual => Box::new(ActualTree::new(&config.dir)),
        TreeMode::Virtual => Box::new(VirtualTree::new(&config.dir)),
        TreeMode::Ideal | TreeMode::Auto => Box::new(
            IdealTree::new(registry, config.concurrency).with_root(manifest),
        ),
    }
}
