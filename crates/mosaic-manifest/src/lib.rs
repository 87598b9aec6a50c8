//! Mosaic Manifest - the untrusted catalog boundary.
//!
//! This crate provides:
//! - Strict validation of raw registry payloads into a typed [`mosaic_core::Catalog`]
//! - A time-bounded, best-effort cache of the last known-good catalog
//! - Catalog sources (HTTP registry, local file) and a loader that falls back
//!   to the cache when the source fails
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use mosaic_manifest::{CatalogLoader, FileStore, HttpCatalogSource, ManifestCache, now_ms};
//! use mosaic_telemetry::ClientContext;
//!
//! # async fn example() -> Result<(), mosaic_manifest::CatalogError> {
//! let source = HttpCatalogSource::new("http://localhost:8081/api/registry")?;
//! let cache = ManifestCache::new(Arc::new(FileStore::new("/tmp/mosaic-cache")));
//! let loader = CatalogLoader::new(Arc::new(source), cache);
//!
//! let loaded = loader.load(&ClientContext::anonymous(), now_ms()).await?;
//! println!("{} routes from {:?}", loaded.catalog.routes().len(), loaded.origin);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod cache;
mod error;
mod loader;
mod source;
mod store;
mod validate;

pub use cache::{CacheEntry, DEFAULT_CACHE_KEY, DEFAULT_TTL, ManifestCache, now_ms};
pub use error::{
    CacheError, CatalogError, CatalogResult, StoreError, StoreResult, ValidationError,
};
pub use loader::{CACHE_FALLBACK_NOTICE, CatalogLoader, LoadedCatalog};
pub use source::{CatalogSource, DEFAULT_FETCH_TIMEOUT, FileCatalogSource, HttpCatalogSource};
pub use store::{CatalogStore, FileStore, MemoryStore};
pub use validate::{validate, validate_str};
