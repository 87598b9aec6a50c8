//! Prelude module - commonly used types for convenient import.
//!
//! Use `use mosaic_manifest::prelude::*;` to import all essential types.

// Validation
pub use crate::{ValidationError, validate, validate_str};

// Cache and storage
pub use crate::{CatalogStore, FileStore, ManifestCache, MemoryStore, now_ms};

// Loading
pub use crate::{
    CatalogError, CatalogLoader, CatalogResult, CatalogSource, FileCatalogSource,
    HttpCatalogSource, LoadedCatalog,
};
