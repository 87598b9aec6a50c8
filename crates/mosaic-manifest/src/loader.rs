//! Fetch, validate and cache the catalog, falling back to the cache.

use std::sync::Arc;

use tracing::{info, warn};

use mosaic_core::Catalog;
use mosaic_events::CatalogOrigin;
use mosaic_telemetry::ClientContext;

use crate::cache::ManifestCache;
use crate::error::{CatalogError, CatalogResult};
use crate::source::CatalogSource;
use crate::validate::validate;

/// Notice attached to a catalog served from the cache.
pub const CACHE_FALLBACK_NOTICE: &str =
    "Registry unavailable; using last-known-good manifest cache.";

/// A catalog ready for use, and where it came from.
#[derive(Debug, Clone)]
pub struct LoadedCatalog {
    /// The validated catalog.
    pub catalog: Arc<Catalog>,
    /// Live source or cache.
    pub origin: CatalogOrigin,
    /// Degradation notice for the user, if any.
    pub notice: Option<String>,
}

impl LoadedCatalog {
    /// Whether the catalog came from the cache.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.origin == CatalogOrigin::Cache
    }
}

/// Loads the catalog from a [`CatalogSource`] with cache fallback.
pub struct CatalogLoader {
    source: Arc<dyn CatalogSource>,
    cache: ManifestCache,
}

impl CatalogLoader {
    /// Create a loader.
    #[must_use]
    pub fn new(source: Arc<dyn CatalogSource>, cache: ManifestCache) -> Self {
        Self { source, cache }
    }

    /// The manifest cache.
    #[must_use]
    pub fn cache(&self) -> &ManifestCache {
        &self.cache
    }

    /// Load a catalog at wall-clock time `now_ms`.
    ///
    /// A live catalog that validates is cached and returned. Any fetch or
    /// validation failure falls back to the cache.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Unavailable`] when neither the source nor the
    /// cache yields a catalog.
    pub async fn load(&self, ctx: &ClientContext, now_ms: u64) -> CatalogResult<LoadedCatalog> {
        match self.fetch_live(ctx).await {
            Ok(catalog) => {
                self.cache.store(&catalog, now_ms);
                info!(
                    source = %self.source.describe(),
                    platform = %catalog.platform(),
                    routes = catalog.routes().len(),
                    "Catalog loaded"
                );
                Ok(LoadedCatalog {
                    catalog: Arc::new(catalog),
                    origin: CatalogOrigin::Live,
                    notice: None,
                })
            },
            Err(live_error) => {
                warn!(
                    source = %self.source.describe(),
                    error = %live_error,
                    "Catalog source failed, trying cache"
                );
                let catalog = self.cache.read(now_ms).ok_or_else(|| CatalogError::Unavailable {
                    reason: live_error.to_string(),
                })?;
                Ok(LoadedCatalog {
                    catalog: Arc::new(catalog),
                    origin: CatalogOrigin::Cache,
                    notice: Some(CACHE_FALLBACK_NOTICE.to_owned()),
                })
            },
        }
    }

    async fn fetch_live(&self, ctx: &ClientContext) -> CatalogResult<Catalog> {
        let raw = self.source.fetch(ctx).await?;
        validate(&raw).map_err(|e| {
            warn!(
                event = "manifest.parse.failure",
                path = %e.path,
                reason = %e.reason,
                "Catalog rejected"
            );
            CatalogError::from(e)
        })
    }
}

impl std::fmt::Debug for CatalogLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogLoader")
            .field("source", &self.source.describe())
            .field("cache", &self.cache)
            .finish()
    }
}
