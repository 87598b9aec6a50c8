//! Time-bounded cache of the last known-good catalog.
//!
//! Best-effort only: storage and parse failures are logged and reported as a
//! miss, never returned to the caller.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use mosaic_core::Catalog;

use crate::error::CacheError;
use crate::store::CatalogStore;
use crate::validate::validate;

/// Storage key of the cached envelope.
pub const DEFAULT_CACHE_KEY: &str = "mfe-shell.manifest.v1";

/// How long a cached catalog stays usable.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

/// Current wall-clock time in milliseconds since the epoch.
#[must_use]
pub fn now_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(default)]
    cached_at: u64,
    #[serde(default)]
    expires_at: u64,
    value: Value,
}

/// A decoded cache entry, as returned by [`ManifestCache::peek`].
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// When the catalog was stored (ms since epoch).
    pub cached_at: u64,
    /// When it stops being served (ms since epoch).
    pub expires_at: u64,
    /// The cached catalog.
    pub catalog: Catalog,
}

impl CacheEntry {
    /// Whether the entry is past its expiry at `now_ms`. The expiry instant
    /// itself is still served.
    #[must_use]
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_at == 0 || self.expires_at < now_ms
    }
}

/// Manifest cache over an optional [`CatalogStore`].
///
/// Without a store every read misses and every write is dropped.
#[derive(Debug, Clone)]
pub struct ManifestCache {
    store: Option<Arc<dyn CatalogStore>>,
    key: String,
    ttl: Duration,
}

impl ManifestCache {
    /// Cache backed by `store` with the default key and TTL.
    #[must_use]
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            store: Some(store),
            key: DEFAULT_CACHE_KEY.to_owned(),
            ttl: DEFAULT_TTL,
        }
    }

    /// Cache with no storage.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            store: None,
            key: DEFAULT_CACHE_KEY.to_owned(),
            ttl: DEFAULT_TTL,
        }
    }

    /// Use a different storage key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Use a different TTL for [`store`](Self::store).
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Storage key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Configured TTL.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Whether a store is attached.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.store.is_some()
    }

    /// Store `catalog` with the configured TTL.
    pub fn store(&self, catalog: &Catalog, now_ms: u64) {
        self.store_with_ttl(catalog, self.ttl, now_ms);
    }

    /// Store `catalog`, replacing any previous entry.
    pub fn store_with_ttl(&self, catalog: &Catalog, ttl: Duration, now_ms: u64) {
        let Some(store) = &self.store else {
            return;
        };

        let envelope = Envelope {
            cached_at: now_ms,
            expires_at: now_ms.saturating_add(duration_ms(ttl)),
            value: catalog.to_wire(),
        };
        let result = serde_json::to_string(&envelope)
            .map_err(CacheError::from)
            .and_then(|json| store.set(&self.key, &json).map_err(CacheError::from));

        match result {
            Ok(()) => debug!(
                key = %self.key,
                expires_at = envelope.expires_at,
                "Catalog cached"
            ),
            Err(e) => warn!(key = %self.key, error = %e, "Failed to cache catalog"),
        }
    }

    /// Read the cached catalog if it is present, well formed and unexpired.
    ///
    /// Anything else is purged from storage and reported as `None`.
    #[must_use]
    pub fn read(&self, now_ms: u64) -> Option<Catalog> {
        match self.lookup(now_ms) {
            Ok(catalog) => {
                info!(
                    event = "manifest.cache.hit",
                    key = %self.key,
                    platform = %catalog.platform(),
                    "Serving cached catalog"
                );
                Some(catalog)
            },
            Err(CacheError::Missing | CacheError::Unavailable) => None,
            Err(reason) => {
                self.purge();
                warn!(
                    event = "manifest.cache.purged",
                    key = %self.key,
                    reason = %reason,
                    "Discarded cached catalog"
                );
                None
            },
        }
    }

    /// Decode the stored entry without checking expiry or purging.
    ///
    /// # Errors
    ///
    /// Returns why no usable entry could be decoded.
    pub fn peek(&self) -> Result<CacheEntry, CacheError> {
        let store = self.store.as_ref().ok_or(CacheError::Unavailable)?;
        let raw = store.get(&self.key)?.ok_or(CacheError::Missing)?;
        let envelope: Envelope = serde_json::from_str(&raw)?;
        let catalog = validate(&envelope.value)?;

        Ok(CacheEntry {
            cached_at: envelope.cached_at,
            expires_at: envelope.expires_at,
            catalog,
        })
    }

    /// Remove the stored entry. Returns `false` if storage failed.
    pub fn purge(&self) -> bool {
        let Some(store) = &self.store else {
            return true;
        };
        match store.remove(&self.key) {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to purge cached catalog");
                false
            },
        }
    }

    fn lookup(&self, now_ms: u64) -> Result<Catalog, CacheError> {
        let entry = self.peek()?;
        if entry.is_expired(now_ms) {
            return Err(CacheError::Expired {
                expires_at: entry.expires_at,
            });
        }
        Ok(entry.catalog)
    }
}
