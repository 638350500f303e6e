//! HTTP client shared foundation
//!
//! This module provides a shared HTTP client with:
//! - Configurable timeout and User-Agent
//! - Exponential backoff retry logic (max 3 retries)
//! - Rate limit error handling
//! - Proxy support through `HTTPS_PROXY` / `HTTP_PROXY`

use crate::error::RegistryError;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Default timeout for HTTP requests (30 seconds)
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default User-Agent header
const DEFAULT_USER_AGENT: &str = concat!("enginefit/", env!("CARGO_PKG_VERSION"));

/// Maximum number of retry attempts
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (in milliseconds)
const BASE_DELAY_MS: u64 = 100;

/// HTTP client wrapper with retry logic
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    max_retries: u32,
}

/// What a request was for, used to build error messages
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    /// The resource being fetched (package name or index file)
    pub resource: &'a str,
    /// The registry or host name
    pub registry: &'a str,
}

impl<'a> RequestContext<'a> {
    pub fn new(resource: &'a str, registry: &'a str) -> Self {
        Self { resource, registry }
    }

    fn network(&self, message: impl Into<String>) -> RegistryError {
        RegistryError::network_error(self.resource, self.registry, message)
    }

    fn invalid(&self, message: impl Into<String>) -> RegistryError {
        RegistryError::InvalidResponse {
            package: self.resource.to_string(),
            registry: self.registry.to_string(),
            message: message.into(),
        }
    }
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, RegistryError> {
        Self::with_config(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(timeout: Duration, user_agent: &str) -> Result<Self, RegistryError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                RegistryError::network_error(
                    "",
                    "HTTP client",
                    format!("failed to create HTTP client: {}", e),
                )
            })?;

        Ok(Self {
            client,
            max_retries: MAX_RETRIES,
        })
    }

    /// Set the maximum number of retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Perform a GET request with retry logic and error context
    pub async fn get(
        &self,
        url: &str,
        accept: Option<&'static str>,
        ctx: RequestContext<'_>,
    ) -> Result<reqwest::Response, RegistryError> {
        let mut last_error = None;
        let mut delay = BASE_DELAY_MS;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                debug!("retrying {} (attempt {})", url, attempt + 1);
                tokio::time::sleep(Duration::from_millis(delay)).await;
                delay *= 2;
            }

            let mut request = self.client.get(url);
            if let Some(accept) = accept {
                request = request.header(ACCEPT, HeaderValue::from_static(accept));
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) if e.is_timeout() => {
                    last_error = Some(RegistryError::timeout(ctx.resource, ctx.registry));
                    continue;
                }
                Err(e) => {
                    last_error = Some(ctx.network(e.to_string()));
                    continue;
                }
            };

            let status = response.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                last_error = Some(RegistryError::rate_limit_exceeded(ctx.registry));
                continue;
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(RegistryError::package_not_found(ctx.resource, ctx.registry));
            }
            if !status.is_success() {
                return Err(ctx.network(format!("HTTP {}", status)));
            }
            return Ok(response);
        }

        Err(last_error.unwrap_or_else(|| ctx.network("unknown error")))
    }

    /// Perform a GET request and parse the JSON body, retrying truncated bodies
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        accept: Option<&'static str>,
        ctx: RequestContext<'_>,
    ) -> Result<T, RegistryError> {
        let mut last_error = None;
        let mut delay = BASE_DELAY_MS;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                delay *= 2;
            }

            // Network errors are already retried in get
            let response = self.get(url, accept, ctx).await?;
            match response.json::<T>().await {
                Ok(parsed) => return Ok(parsed),
                Err(e) => {
                    last_error = Some(ctx.invalid(format!("failed to parse JSON: {}", e)));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ctx.invalid("unknown JSON parse error")))
    }
}
