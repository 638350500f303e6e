//! Offline release catalog loaded from a JSON file
//!
//! Two shapes are accepted:
//! - A copy of `https://nodejs.org/dist/index.json` (node releases only)
//! - An object mapping engines to version lists: `{ "node": ["v20.10.0", ...] }`

use crate::domain::{Engine, Version, VersionCatalog};
use crate::error::RegistryError;
use crate::registry::node_dist::{relevant_versions, IndexEntry};
use crate::registry::CatalogSource;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    NodeIndex(Vec<IndexEntry>),
    PerEngine(BTreeMap<String, Vec<String>>),
}

/// Catalog source backed by a local file
pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parses catalog file contents
    pub fn parse(&self, content: &str, engines: &[Engine]) -> Result<VersionCatalog, RegistryError> {
        let file: CatalogFile = serde_json::from_str(content)
            .map_err(|e| RegistryError::catalog_file(&self.path, e.to_string()))?;

        let mut catalog = VersionCatalog::new();
        match file {
            CatalogFile::NodeIndex(entries) => {
                catalog.insert(Engine::Node, relevant_versions(entries));
            }
            CatalogFile::PerEngine(map) => {
                for (key, raws) in map {
                    let engine = match key.parse::<Engine>() {
                        Ok(engine) => engine,
                        Err(_) => continue,
                    };
                    let versions = raws
                        .iter()
                        .map(|raw| Version::parse(raw))
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(|e| RegistryError::catalog_file(&self.path, e.to_string()))?;
                    catalog.insert(engine, versions);
                }
            }
        }

        for engine in engines {
            if !catalog.contains(*engine) {
                return Err(RegistryError::MissingCatalog { engine: *engine });
            }
        }
        Ok(catalog)
    }
}

#[async_trait]
impl CatalogSource for FileCatalog {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn fetch_catalog(&self, engines: &[Engine]) -> Result<VersionCatalog, RegistryError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| RegistryError::catalog_file(&self.path, e.to_string()))?;
        self.parse(&content, engines)
    }
}
