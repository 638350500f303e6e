//! Ideal tree resolved from `package.json` against the registry
//!
//! Resolution is breadth first: every dependency spec picks the highest
//! published version it allows, and each `name@version` appears once.
//! Packuments of a level are fetched concurrently, bounded by a semaphore.

use super::{GraphNode, GraphWalker, NodeFlags, TreeMode};
use crate::error::{GraphError, RegistryError};
use crate::manifest::{engine_ranges, RootManifest};
use crate::registry::{PackageRegistry, PackageVersion, Packument};
use async_trait::async_trait;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Default number of concurrent packument requests
pub const DEFAULT_CONCURRENCY: usize = 10;

const ALIAS_PREFIX: &str = "npm:";

/// A dependency edge waiting to be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
struct Edge {
    name: String,
    spec: String,
    flags: NodeFlags,
}

impl Edge {
    fn new(name: &str, spec: &str, flags: NodeFlags) -> Self {
        Self {
            name: name.to_string(),
            spec: spec.to_string(),
            flags,
        }
    }

    /// Package and spec to look up, following `npm:` aliases
    fn target(&self) -> (&str, &str) {
        let Some(aliased) = self.spec.strip_prefix(ALIAS_PREFIX) else {
            return (&self.name, &self.spec);
        };
        // The version separator is the last `@` past a leading scope marker
        match aliased.get(1..).and_then(|rest| rest.rfind('@')) {
            Some(at) => (&aliased[..at + 1], &aliased[at + 2..]),
            None => (aliased, "latest"),
        }
    }

    /// Ranges and dist-tags resolve from the registry; git, file and url specs do not
    fn is_registry_spec(spec: &str) -> bool {
        !spec.contains(':') && !spec.contains('/')
    }
}

type PackumentCache = HashMap<String, Result<Arc<Packument>, RegistryError>>;

/// Walker that builds the tree from the registry
pub struct IdealTree {
    registry: Arc<dyn PackageRegistry>,
    semaphore: Arc<Semaphore>,
    roots: Vec<Edge>,
}

impl IdealTree {
    pub fn new(registry: Arc<dyn PackageRegistry>, concurrency: usize) -> Self {
        Self {
            registry,
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            roots: Vec::new(),
        }
    }

    /// Seeds the walk with the root package's dependencies
    pub fn with_root(mut self, manifest: &RootManifest) -> Self {
        let kinds = [
            (&manifest.dependencies, NodeFlags::default()),
            (
                &manifest.dev_dependencies,
                NodeFlags {
                    dev: true,
                    ..Default::default()
                },
            ),
            (
                &manifest.optional_dependencies,
                NodeFlags {
                    optional: true,
                    ..Default::default()
                },
            ),
            (
                &manifest.peer_dependencies,
                NodeFlags {
                    peer: true,
                    ..Default::default()
                },
            ),
        ];
        for (deps, flags) in kinds {
            self.roots
                .extend(deps.iter().map(|(name, spec)| Edge::new(name, spec, flags)));
        }
        self
    }

    /// Fetches packuments concurrently
    async fn fetch_all(
        &self,
        names: BTreeSet<String>,
        cache: &mut PackumentCache,
    ) -> Result<(), GraphError> {
        let mut tasks = JoinSet::new();
        for name in names {
            let registry = Arc::clone(&self.registry);
            let semaphore = Arc::clone(&self.semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let result = registry.packument(&name).await.map(Arc::new);
                (name, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (name, result) = joined.map_err(|e| GraphError::Walker {
                message: e.to_string(),
            })?;
            debug!("fetched packument for {}", name);
            cache.insert(name, result);
        }
        Ok(())
    }

    /// Resolves one edge, queueing its dependencies when the tree changed
    fn visit(
        &self,
        edge: &Edge,
        cache: &PackumentCache,
        resolved: &mut BTreeMap<(String, String), GraphNode>,
        next: &mut Vec<Edge>,
    ) -> Result<(), GraphError> {
        let (name, spec) = edge.target();
        let optional = edge.flags.optional;

        let packument = match cache.get(name) {
            Some(Ok(packument)) => packument,
            Some(Err(e)) if optional => {
                warn!("skipping optional dependency {}: {}", name, e);
                return Ok(());
            }
            Some(Err(e)) => {
                return Err(GraphError::Resolve {
                    package: name.to_string(),
                    source: e.clone(),
                })
            }
            None => return Ok(()),
        };

        let Some((version, meta)) = packument.resolve(spec) else {
            if optional {
                warn!("skipping optional dependency {}@{}: no matching version", name, spec);
                return Ok(());
            }
            return Err(GraphError::no_matching_version(name, spec));
        };

        let flags = match resolved.entry((name.to_string(), version.raw().to_string())) {
            Entry::Occupied(mut existing) => {
                let merged = existing.get().flags.merge(edge.flags);
                if merged == existing.get().flags {
                    return Ok(());
                }
                existing.get_mut().flags = merged;
                merged
            }
            Entry::Vacant(slot) => {
                slot.insert(GraphNode {
                    name: name.to_string(),
                    version: Some(version.raw().to_string()),
                    engines: meta.engines.as_ref().map(engine_ranges).unwrap_or_default(),
                    flags: edge.flags,
                    in_bundle: false,
                });
                edge.flags
            }
        };

        next.extend(child_edges(meta, flags));
        Ok(())
    }
}

/// Dependency edges of a resolved package, carrying the parent's flags
fn child_edges(meta: &PackageVersion, parent: NodeFlags) -> Vec<Edge> {
    let mut edges = Vec::new();
    for (name, spec) in &meta.dependencies {
        if !meta.optional_dependencies.contains_key(name) {
            edges.push(Edge::new(name, spec, parent));
        }
    }
    for (name, spec) in &meta.optional_dependencies {
        let flags = NodeFlags {
            optional: true,
            ..parent
        };
        edges.push(Edge::new(name, spec, flags));
    }
    for (name, spec) in &meta.peer_dependencies {
        if meta.peer_dependencies_meta.get(name).is_some_and(|m| m.optional) {
            continue;
        }
        let flags = NodeFlags {
            peer: true,
            ..parent
        };
        edges.push(Edge::new(name, spec, flags));
    }
    edges
}

#[async_trait]
impl GraphWalker for IdealTree {
    fn mode(&self) -> TreeMode {
        TreeMode::Ideal
    }

    async fn nodes(&self) -> Result<Vec<GraphNode>, GraphError> {
        let mut cache = PackumentCache::new();
        let mut resolved = BTreeMap::new();
        let mut queue = self.roots.clone();

        while !queue.is_empty() {
            queue.retain(|edge| {
                let keep = Edge::is_registry_spec(edge.target().1);
                if !keep {
                    debug!("skipping non-registry dependency {}@{}", edge.name, edge.spec);
                }
                keep
            });
            let missing: BTreeSet<String> = queue
                .iter()
                .map(|edge| edge.target().0)
                .filter(|name| !cache.contains_key(*name))
                .map(String::from)
                .collect();
            self.fetch_all(missing, &mut cache).await?;

            let mut next = Vec::new();
            for edge in &queue {
                self.visit(edge, &cache, &mut resolved, &mut next)?;
            }
            queue = next;
        }

        Ok(resolved.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Engine;
    use std::sync::Mutex;

    /// Registry serving packuments from memory
    struct MemoryRegistry {
        packuments: HashMap<String, String>,
        requests: Mutex<Vec<String>>,
    }

    impl MemoryRegistry {
        fn new(packuments: &[(&str, &str)]) -> Self {
            Self {
                packuments: packuments
                    .iter()
                    .map(|(name, body)| (name.to_string(), body.to_string()))
                    .collect(),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PackageRegistry for MemoryRegistry {
        fn registry_name(&self) -> &'static str {
            "memory"
        }

        async fn packument(&self, package: &str) -> Result<Packument, RegistryError> {
            self.requests.lock().unwrap().push(package.to_string());
            let body = self
                .packuments
                .get(package)
                .ok_or_else(|| RegistryError::package_not_found(package, "memory"))?;
            Ok(serde_json::from_str(body).unwrap())
        }
    }

    fn manifest(content: &str) -> RootManifest {
        RootManifest::parse("package.json", content).unwrap()
    }

    async fn walk(registry: MemoryRegistry, root: &str) -> Result<Vec<GraphNode>, GraphError> {
        IdealTree::new(Arc::new(registry), 4)
            .with_root(&manifest(root))
            .nodes()
            .await
    }

    fn by_name<'a>(nodes: &'a [GraphNode], name: &str) -> &'a GraphNode {
        nodes.iter().find(|n| n.name == name).unwrap()
    }

    fn registry() -> MemoryRegistry {
        MemoryRegistry::new(&[
            (
                "one",
                r#"{ "versions": {
                    "1.0.0": { "engines": { "node": ">=14" } },
                    "1.2.0": { "engines": { "node": ">=16" }, "dependencies": { "shared": "^2" } }
                } }"#,
            ),
            (
                "tool",
                r#"{ "versions": {
                    "3.0.0": { "engines": { "node": ">=20" }, "dependencies": { "shared": "^2.1" } }
                } }"#,
            ),
            (
                "shared",
                r#"{ "versions": {
                    "2.0.0": { "engines": { "node": ">=12" } },
                    "2.1.0": { "engines": { "node": ">=12" } }
                } }"#,
            ),
        ])
    }

    #[test]
    fn test_alias_target() {
        let edge = Edge::new("alias", "npm:real@^1.0.0", NodeFlags::default());
        assert_eq!(edge.target(), ("real", "^1.0.0"));

        let scoped = Edge::new("alias", "npm:@scope/real@2", NodeFlags::default());
        assert_eq!(scoped.target(), ("@scope/real", "2"));

        let bare = Edge::new("alias", "npm:real", NodeFlags::default());
        assert_eq!(bare.target(), ("real", "latest"));

        let plain = Edge::new("plain", "^3", NodeFlags::default());
        assert_eq!(plain.target(), ("plain", "^3"));
    }

    #[test]
    fn test_is_registry_spec() {
        assert!(Edge::is_registry_spec("^1.2.3"));
        assert!(Edge::is_registry_spec("latest"));
        assert!(!Edge::is_registry_spec("github:user/repo"));
        assert!(!Edge::is_registry_spec("user/repo"));
        assert!(!Edge::is_registry_spec("file:../local"));
    }

    #[tokio::test]
    async fn test_resolves_highest_and_transitive() {
        let nodes = walk(registry(), r#"{ "dependencies": { "one": "^1" } }"#)
            .await
            .unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(by_name(&nodes, "one").version.as_deref(), Some("1.2.0"));
        assert_eq!(by_name(&nodes, "one").engines[&Engine::Node], ">=16");
        assert_eq!(by_name(&nodes, "shared").version.as_deref(), Some("2.1.0"));
    }

    #[tokio::test]
    async fn test_dev_flag_cleared_by_production_path() {
        let nodes = walk(
            registry(),
            r#"{ "dependencies": { "one": "^1" }, "devDependencies": { "tool": "^3" } }"#,
        )
        .await
        .unwrap();
        assert!(by_name(&nodes, "tool").flags.dev);
        assert!(!by_name(&nodes, "one").flags.dev);
        // shared@2.1.0 is reachable from both one and tool
        assert!(!by_name(&nodes, "shared").flags.dev);
    }

    #[tokio::test]
    async fn test_dev_only_subtree() {
        let nodes = walk(registry(), r#"{ "devDependencies": { "tool": "^3" } }"#)
            .await
            .unwrap();
        assert!(nodes.iter().all(|n| n.flags.dev));
    }

    #[tokio::test]
    async fn test_packuments_fetched_once() {
        let registry = Arc::new(registry());
        IdealTree::new(registry.clone(), 2)
            .with_root(&manifest(
                r#"{ "dependencies": { "one": "^1", "tool": "^3" } }"#,
            ))
            .nodes()
            .await
            .unwrap();
        let requests = registry.requests.lock().unwrap();
        assert_eq!(requests.iter().filter(|r| *r == "shared").count(), 1);
    }

    #[tokio::test]
    async fn test_missing_package_fails() {
        let result = walk(registry(), r#"{ "dependencies": { "ghost": "^1" } }"#).await;
        assert!(matches!(result, Err(GraphError::Resolve { .. })));
    }

    #[tokio::test]
    async fn test_missing_optional_package_skipped() {
        let nodes = walk(
            registry(),
            r#"{ "dependencies": { "one": "^1" }, "optionalDependencies": { "ghost": "^1" } }"#,
        )
        .await
        .unwrap();
        assert_eq!(nodes.len(), 2);
    }

    #[tokio::test]
    async fn test_no_matching_version() {
        let result = walk(registry(), r#"{ "dependencies": { "one": "^9" } }"#).await;
        assert!(matches!(result, Err(GraphError::NoMatchingVersion { .. })));
    }

    #[tokio::test]
    async fn test_non_registry_specs_skipped() {
        let nodes = walk(
            registry(),
            r#"{ "dependencies": { "local": "file:../local", "gh": "user/repo" } }"#,
        )
        .await
        .unwrap();
        assert!(nodes.is_empty());
    }

    #[tokio::test]
    async fn test_peer_dependencies() {
        let registry = MemoryRegistry::new(&[
            (
                "plugin",
                r#"{ "versions": { "1.0.0": {
                    "peerDependencies": { "host": "^2", "maybe": "^1" },
                    "peerDependenciesMeta": { "maybe": { "optional": true } }
                } } }"#,
            ),
            ("host", r#"{ "versions": { "2.0.0": { "engines": { "node": ">=18" } } } }"#),
        ]);
        let nodes = walk(registry, r#"{ "dependencies": { "plugin": "^1" } }"#)
            .await
            .unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(by_name(&nodes, "host").flags.peer);
        assert!(!by_name(&nodes, "plugin").flags.peer);
    }
}
