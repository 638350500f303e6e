//! Registry adapters for release catalogs and package metadata
//!
//! This module provides:
//! - HTTP client shared foundation with retry logic
//! - Node.js release index (nodejs.org/dist)
//! - npm Registry adapter (packuments and npm releases)
//! - Offline catalog files

mod client;
mod file;
mod node_dist;
mod npm;

pub use client::{HttpClient, RequestContext};
pub use file::FileCatalog;
pub use node_dist::{NodeDistSource, NODE_DIST_URL};
pub use npm::{NpmRegistry, PackageVersion, Packument, PeerMeta, NPM_REGISTRY_URL};

use crate::domain::{Engine, VersionCatalog};
use crate::error::RegistryError;
use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

/// Trait for sources of engine release lists
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Get the source name
    fn name(&self) -> &'static str;

    /// Fetch the releases of every given engine
    async fn fetch_catalog(&self, engines: &[Engine]) -> Result<VersionCatalog, RegistryError>;
}

/// Trait for package metadata registries
#[async_trait]
pub trait PackageRegistry: Send + Sync {
    /// Get the registry name
    fn registry_name(&self) -> &'static str;

    /// Fetch the metadata document of a package
    async fn packument(&self, package: &str) -> Result<Packument, RegistryError>;
}

/// Catalog fetched from nodejs.org and the npm registry
pub struct RemoteCatalog {
    node: NodeDistSource,
    npm: NpmRegistry,
}

impl RemoteCatalog {
    pub fn new(node: NodeDistSource, npm: NpmRegistry) -> Self {
        Self { node, npm }
    }
}

#[async_trait]
impl CatalogSource for RemoteCatalog {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn fetch_catalog(&self, engines: &[Engine]) -> Result<VersionCatalog, RegistryError> {
        let mut catalog = VersionCatalog::new();
        for engine in engines {
            let versions = match engine {
                Engine::Node => self.node.fetch_versions().await?,
                Engine::Npm => self.npm.fetch_npm_versions().await?,
            };
            debug!("fetched {} {} releases", versions.len(), engine);
            if versions.is_empty() {
                return Err(RegistryError::MissingCatalog { engine: *engine });
            }
            catalog.insert(*engine, versions);
        }
        Ok(catalog)
    }
}

/// Create the catalog source: an offline file when given, otherwise the network
pub fn create_catalog_source(
    catalog_file: Option<&Path>,
    client: HttpClient,
    registry_url: &str,
) -> Box<dyn CatalogSource> {
    match catalog_file {
        Some(path) => Box::new(FileCatalog::new(path)),
        None => Box::new(RemoteCatalog::new(
            NodeDistSource::new(client.clone()),
            NpmRegistry::with_base_url(client, registry_url),
        )),
    }
}
