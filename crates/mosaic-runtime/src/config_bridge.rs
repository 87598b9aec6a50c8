//! Bridge from `mosaic_config::Config` to domain types.
//!
//! The config crate depends on no other internal crate. Everything that turns
//! a loaded [`Config`] into engine, catalog or telemetry collaborators lives
//! here so that the CLI and tests assemble a shell the same way.

use std::sync::Arc;

use mosaic_config::Config;
use mosaic_core::BackoffPolicy;
use mosaic_manifest::{
    CatalogLoader, CatalogSource, FileCatalogSource, FileStore, HttpCatalogSource, ManifestCache,
};
use mosaic_telemetry::{HttpTelemetrySink, LogConfig, MemoryTelemetrySink, TelemetrySink};

use crate::engine::EngineConfig;
use crate::error::{RuntimeError, RuntimeResult};

/// Convert config to [`EngineConfig`].
#[must_use]
pub fn to_engine_config(cfg: &Config) -> EngineConfig {
    let resolution = &cfg.resolution;
    EngineConfig {
        backoff: BackoffPolicy::new(
            resolution.max_retries,
            resolution.base_delay(),
            resolution.max_delay(),
        ),
        attempt_timeout: resolution.attempt_timeout(),
    }
}

/// Convert config to [`LogConfig`].
#[must_use]
pub fn to_log_config(cfg: &Config) -> LogConfig {
    LogConfig::from(&cfg.logging)
}

/// Build the manifest cache.
///
/// Uses a [`FileStore`] in the configured (or platform) cache directory. When
/// no directory can be determined the cache runs without storage.
#[must_use]
pub fn to_manifest_cache(cfg: &Config) -> ManifestCache {
    let manifest = &cfg.manifest;
    let cache = match manifest.resolved_cache_dir() {
        Some(dir) => ManifestCache::new(Arc::new(FileStore::new(dir))),
        None => ManifestCache::unavailable(),
    };
    cache
        .with_key(manifest.cache_key.clone())
        .with_ttl(manifest.cache_ttl())
}

/// Build the catalog source. A local catalog file wins over the registry.
///
/// # Errors
///
/// Returns an error if neither is configured or the HTTP client fails.
pub fn to_catalog_source(cfg: &Config) -> RuntimeResult<Arc<dyn CatalogSource>> {
    let manifest = &cfg.manifest;
    if let Some(path) = &manifest.catalog_file {
        return Ok(Arc::new(FileCatalogSource::new(path)));
    }
    let url = manifest.registry_url.as_deref().ok_or_else(|| {
        RuntimeError::Config("manifest.registry_url or manifest.catalog_file is required".into())
    })?;
    Ok(Arc::new(HttpCatalogSource::with_timeout(
        url,
        manifest.fetch_timeout(),
    )?))
}

/// Build the catalog loader (source plus cache).
///
/// # Errors
///
/// See [`to_catalog_source`].
pub fn to_catalog_loader(cfg: &Config) -> RuntimeResult<CatalogLoader> {
    Ok(CatalogLoader::new(
        to_catalog_source(cfg)?,
        to_manifest_cache(cfg),
    ))
}

/// Build the telemetry sink.
///
/// Enabled telemetry posts to the collector; otherwise events are kept in a
/// bounded in-memory buffer.
///
/// # Errors
///
/// Returns an error if telemetry is enabled without an endpoint or the HTTP
/// client fails.
pub fn to_telemetry_sink(cfg: &Config) -> RuntimeResult<Arc<dyn TelemetrySink>> {
    let telemetry = &cfg.telemetry;
    if !telemetry.enabled {
        return Ok(Arc::new(MemoryTelemetrySink::with_capacity(
            telemetry.buffer_size,
        )));
    }
    let endpoint = telemetry.endpoint.as_deref().ok_or_else(|| {
        RuntimeError::Config("telemetry.endpoint is required when telemetry is enabled".into())
    })?;
    Ok(Arc::new(HttpTelemetrySink::new(endpoint)?))
}
