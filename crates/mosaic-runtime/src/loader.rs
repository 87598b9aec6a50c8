//! Obtaining a loadable reference to a remote entry point.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use mosaic_core::{ResolutionError, ResolutionResult};

use crate::error::{RuntimeError, RuntimeResult};

const ASSETS_ENTRY: &str = "/assets/remoteEntry.js";
const ROOT_ENTRY: &str = "/remoteEntry.js";

/// What to load: one module of one remote at one entry URL.
///
/// Also the deduplication key of the resolution cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadRequest {
    /// Remote scope.
    pub scope: String,
    /// Module within the remote.
    pub module: String,
    /// Entry point URL.
    pub url: String,
}

impl LoadRequest {
    /// Create a request.
    #[must_use]
    pub fn new(scope: impl Into<String>, module: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            module: module.into(),
            url: url.into(),
        }
    }

    /// The same module at a different entry URL.
    #[must_use]
    pub fn with_url(&self, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..self.clone()
        }
    }
}

/// A resolved reference to a loadable remote module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteModule {
    /// Remote scope.
    pub scope: String,
    /// Module within the remote.
    pub module: String,
    /// Entry URL that answered. May differ from the requested URL after an
    /// entry-path fallback.
    pub entry_url: String,
    /// Entity tag reported by the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Entry size reported by the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
    /// When the entry answered.
    pub fetched_at: DateTime<Utc>,
}

/// Loads remote entry points.
#[async_trait]
pub trait RemoteLoader: Send + Sync {
    /// Resolve `request` to a loadable reference.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::NotFound`] when the entry definitely does
    /// not exist and [`ResolutionError::Transient`] for anything else.
    async fn load(&self, request: &LoadRequest) -> ResolutionResult<RemoteModule>;
}

/// The other conventional entry location for `url`, if it uses one.
#[must_use]
pub fn alternate_entry_url(url: &str) -> Option<String> {
    if let Some(base) = url.strip_suffix(ASSETS_ENTRY) {
        return Some(format!("{base}{ROOT_ENTRY}"));
    }
    url.strip_suffix(ROOT_ENTRY)
        .map(|base| format!("{base}{ASSETS_ENTRY}"))
}

/// Load `request`, retrying once at the alternate entry path when the
/// entry is missing.
pub(crate) async fn load_with_entry_fallback(
    loader: &dyn RemoteLoader,
    route_id: &str,
    request: &LoadRequest,
) -> ResolutionResult<RemoteModule> {
    let error = match loader.load(request).await {
        Ok(module) => return Ok(module),
        Err(error) => error,
    };

    let alternate = match (&error, alternate_entry_url(&request.url)) {
        (ResolutionError::NotFound { .. }, Some(alternate)) => alternate,
        _ => return Err(error),
    };

    warn!(
        event = "remote.load.entry_path_fallback",
        route_id,
        scope = %request.scope,
        original_url = %request.url,
        fallback_url = %alternate,
        error = %error,
        "Remote entry missing, trying alternate path"
    );
    loader.load(&request.with_url(alternate)).await
}

/// Fetches remote entries over HTTP.
///
/// The client has no timeout of its own; attempts are bounded by the
/// resolution engine.
#[derive(Debug, Clone)]
pub struct HttpRemoteLoader {
    client: reqwest::Client,
}

impl HttpRemoteLoader {
    /// Create a loader with a default client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> RuntimeResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("mosaic/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RuntimeError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self::with_client(client))
    }

    /// Create a loader with a preconfigured client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteLoader for HttpRemoteLoader {
    async fn load(&self, request: &LoadRequest) -> ResolutionResult<RemoteModule> {
        debug!(scope = %request.scope, url = %request.url, "Fetching remote entry");

        let response = self
            .client
            .get(&request.url)
            .send()
            .await
            .map_err(|e| ResolutionError::Transient {
                url: request.url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
            return Err(ResolutionError::NotFound {
                url: request.url.clone(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }
        if !status.is_success() {
            return Err(ResolutionError::Transient {
                url: request.url.clone(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        let etag = response
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        Ok(RemoteModule {
            scope: request.scope.clone(),
            module: request.module.clone(),
            entry_url: request.url.clone(),
            etag,
            content_length: response.content_length(),
            fetched_at: Utc::now(),
        })
    }
}
