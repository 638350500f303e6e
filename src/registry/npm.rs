//! npm Registry adapter
//!
//! Fetches package metadata (packuments) from the npm registry, and the
//! list of published npm releases for the `npm` engine.
//! API endpoint: https://registry.npmjs.org/{package}

use crate::domain::{Range, Version};
use crate::error::RegistryError;
use crate::registry::client::{HttpClient, RequestContext};
use crate::registry::PackageRegistry;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;

/// npm registry base URL
pub const NPM_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Abbreviated metadata; still carries `engines` and dependency maps
const ABBREVIATED_ACCEPT: &str =
    "application/vnd.npm.install-v1+json; q=1.0, application/json; q=0.8, */*";

/// Package metadata document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Packument {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "dist-tags")]
    pub dist_tags: BTreeMap<String, String>,
    #[serde(default)]
    pub versions: BTreeMap<String, PackageVersion>,
}

/// Metadata of one published version
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageVersion {
    /// Raw `engines` value; may be an object or a legacy array
    #[serde(default)]
    pub engines: Option<serde_json::Value>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub optional_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub peer_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub peer_dependencies_meta: BTreeMap<String, PeerMeta>,
}

/// `peerDependenciesMeta` entry
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PeerMeta {
    #[serde(default)]
    pub optional: bool,
}

impl Packument {
    /// Resolves a dependency spec to the highest satisfying published version
    ///
    /// Dist-tags (`latest`, `next`) are honored. Prereleases only match
    /// ranges that name them.
    pub fn resolve(&self, spec: &str) -> Option<(Version, &PackageVersion)> {
        if let Some(tagged) = self.dist_tags.get(spec.trim()) {
            let meta = self.versions.get(tagged)?;
            return Version::parse(tagged).ok().map(|v| (v, meta));
        }
        let range = Range::parse(spec).ok()?;
        self.versions
            .iter()
            .filter_map(|(raw, meta)| Version::parse(raw).ok().map(|v| (v, meta)))
            .filter(|(v, _)| range.test(v))
            .max_by(|(a, _), (b, _)| a.cmp(b))
    }
}

/// npm Registry adapter
pub struct NpmRegistry {
    client: HttpClient,
    base_url: String,
}

impl NpmRegistry {
    /// Create a new npm adapter
    pub fn new(client: HttpClient) -> Self {
        Self::with_base_url(client, NPM_REGISTRY_URL)
    }

    /// Create an adapter for a custom registry
    pub fn with_base_url(client: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build the URL for a package
    fn build_url(&self, package: &str) -> String {
        if package.starts_with('@') {
            format!("{}/{}", self.base_url, package.replacen('/', "%2F", 1))
        } else {
            format!("{}/{}", self.base_url, package)
        }
    }

    /// Published npm releases, as `v`-prefixed versions
    pub async fn fetch_npm_versions(&self) -> Result<Vec<Version>, RegistryError> {
        let packument = self.packument("npm").await?;
        Ok(packument
            .versions
            .keys()
            .filter_map(|raw| Version::parse(&format!("v{}", raw)).ok())
            .collect())
    }
}

#[async_trait]
impl PackageRegistry for NpmRegistry {
    fn registry_name(&self) -> &'static str {
        "npm"
    }

    async fn packument(&self, package: &str) -> Result<Packument, RegistryError> {
        let url = self.build_url(package);
        self.client
            .get_json(
                &url,
                Some(ABBREVIATED_ACCEPT),
                RequestContext::new(package, self.registry_name()),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn packument() -> Packument {
        serde_json::from_str(
            r#"{
                "name": "left-pad",
                "dist-tags": { "latest": "1.3.0", "next": "2.0.0-rc.1" },
                "versions": {
                    "1.0.0": { "engines": { "node": ">=0.10" } },
                    "1.3.0": { "engines": { "node": ">=4" }, "dependencies": { "a": "^1" } },
                    "2.0.0-rc.1": { "engines": ["node >= 18"] }
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_build_url() {
        let registry = NpmRegistry::new(HttpClient::new().unwrap());
        assert_eq!(
            registry.build_url("lodash"),
            "https://registry.npmjs.org/lodash"
        );
    }

    #[test]
    fn test_build_url_scoped_package() {
        let registry = NpmRegistry::new(HttpClient::new().unwrap());
        assert_eq!(
            registry.build_url("@types/node"),
            "https://registry.npmjs.org/@types%2Fnode"
        );
    }

    #[test]
    fn test_registry_name() {
        let registry = NpmRegistry::new(HttpClient::new().unwrap());
        assert_eq!(registry.registry_name(), "npm");
    }

    #[test]
    fn test_resolve_max_satisfying() {
        let packument = packument();
        let (version, meta) = packument.resolve("^1.0.0").unwrap();
        assert_eq!(version.raw(), "1.3.0");
        assert_eq!(meta.dependencies["a"], "^1");
    }

    #[test]
    fn test_resolve_skips_prerelease() {
        let packument = packument();
        let (version, _) = packument.resolve("*").unwrap();
        assert_eq!(version.raw(), "1.3.0");
    }

    #[test]
    fn test_resolve_dist_tag() {
        let packument = packument();
        let (version, meta) = packument.resolve("next").unwrap();
        assert_eq!(version.raw(), "2.0.0-rc.1");
        assert!(meta.engines.as_ref().unwrap().is_array());
    }

    #[test]
    fn test_resolve_unsupported_spec() {
        let packument = packument();
        assert!(packument.resolve("github:user/repo").is_none());
        assert!(packument.resolve("^9").is_none());
    }

    #[tokio::test]
    async fn test_fetch_npm_versions() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/npm");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"name":"npm","versions":{"9.0.0":{},"10.2.3":{}}}"#);
            })
            .await;

        let client = HttpClient::new().unwrap().with_max_retries(0);
        let registry = NpmRegistry::with_base_url(client, server.base_url());
        let versions = registry.fetch_npm_versions().await.unwrap();
        let raws: Vec<_> = versions.iter().map(|v| v.raw()).collect();
        assert!(raws.contains(&"v9.0.0"));
        assert!(raws.contains(&"v10.2.3"));
    }
}
