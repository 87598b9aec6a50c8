//! Where raw catalog payloads come from.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use mosaic_telemetry::ClientContext;

use crate::error::{CatalogError, CatalogResult};

/// Registry request timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(12);

/// A provider of unvalidated catalog JSON.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch the raw payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be obtained or is not JSON.
    async fn fetch(&self, ctx: &ClientContext) -> CatalogResult<Value>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// Fetches the catalog from an HTTP registry.
#[derive(Debug, Clone)]
pub struct HttpCatalogSource {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpCatalogSource {
    /// Registry at `url` with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>) -> CatalogResult<Self> {
        Self::with_timeout(url, DEFAULT_FETCH_TIMEOUT)
    }

    /// Registry at `url` with a custom request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> CatalogResult<Self> {
        let url = url.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("mosaic/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CatalogError::Transport {
                url: url.clone(),
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            url,
            timeout,
        })
    }

    /// Registry URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    fn map_send_error(&self, e: &reqwest::Error) -> CatalogError {
        if e.is_timeout() {
            CatalogError::Timeout {
                url: self.url.clone(),
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else {
            CatalogError::Transport {
                url: self.url.clone(),
                message: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch(&self, ctx: &ClientContext) -> CatalogResult<Value> {
        let ids = ctx.request();
        let started = Instant::now();

        info!(
            event = "api.request",
            url = %self.url,
            request_id = %ids.request_id,
            "Fetching catalog"
        );

        let mut request = self.client.get(&self.url);
        for (name, value) in ctx.headers(&ids) {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(|e| {
            let err = self.map_send_error(&e);
            warn!(
                event = "api.response",
                url = %self.url,
                request_id = %ids.request_id,
                error = %err,
                "Catalog request failed"
            );
            err
        })?;

        let status = response.status();
        info!(
            event = "api.response",
            url = %self.url,
            request_id = %ids.request_id,
            status = status.as_u16(),
            duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Catalog response"
        );

        if !status.is_success() {
            return Err(CatalogError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| CatalogError::Decode(e.to_string()))
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Reads the catalog from a JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileCatalogSource {
    path: PathBuf,
}

impl FileCatalogSource {
    /// Source reading `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CatalogSource for FileCatalogSource {
    async fn fetch(&self, _ctx: &ClientContext) -> CatalogResult<Value> {
        debug!(path = %self.path.display(), "Reading catalog file");

        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| CatalogError::Read {
                path: self.path.display().to_string(),
                source,
            })?;

        serde_json::from_str(&text).map_err(|e| CatalogError::Decode(e.to_string()))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
