//! Node.js release index
//!
//! Fetches the list of published Node.js releases.
//! API endpoint: https://nodejs.org/dist/index.json

use crate::domain::{Range, Version};
use crate::error::RegistryError;
use crate::registry::client::{HttpClient, RequestContext};
use serde::Deserialize;
use std::sync::LazyLock;
use tracing::debug;

/// Node.js distribution base URL
pub const NODE_DIST_URL: &str = "https://nodejs.org/dist";

/// Releases older than this are never worth considering
static OLDEST_RELEVANT: LazyLock<Range> =
    LazyLock::new(|| Range::parse(">= 0.4").unwrap_or_default());

/// One entry of `index.json` (only the fields we need)
#[derive(Debug, Deserialize)]
pub(crate) struct IndexEntry {
    pub version: String,
}

/// Node.js release index client
pub struct NodeDistSource {
    client: HttpClient,
    base_url: String,
}

impl NodeDistSource {
    /// Create a new source for the official distribution site
    pub fn new(client: HttpClient) -> Self {
        Self::with_base_url(client, NODE_DIST_URL)
    }

    /// Create a source for a mirror
    pub fn with_base_url(client: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build the URL of the release index
    fn index_url(&self) -> String {
        format!("{}/index.json", self.base_url)
    }

    /// Fetch every relevant Node.js release
    pub async fn fetch_versions(&self) -> Result<Vec<Version>, RegistryError> {
        let url = self.index_url();
        debug!("fetching node releases from {}", url);
        let entries: Vec<IndexEntry> = self
            .client
            .get_json(&url, None, RequestContext::new("index.json", "nodejs.org"))
            .await?;
        Ok(relevant_versions(entries))
    }
}

/// Parses index entries, dropping unparsable and pre-0.4 releases
pub(crate) fn relevant_versions(entries: Vec<IndexEntry>) -> Vec<Version> {
    entries
        .into_iter()
        .filter_map(|entry| Version::parse(&entry.version).ok())
        .filter(|v| OLDEST_RELEVANT.test(v))
        .collect()
}
