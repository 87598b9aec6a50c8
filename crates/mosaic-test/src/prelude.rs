//! Prelude module - commonly used types for convenient import.
//!
//! Use `use mosaic_test::prelude::*;` to import all essential types.

// Mocks
pub use crate::{MockOutcome, MockRemoteLoader, StaticCatalogSource};

// Harness
pub use crate::{ShellHarness, init_test_logging, test_dir, test_file};

// Fixtures
pub use crate::{
    canary_route_json, canary_url, catalog_json, route_json, sample_catalog, sample_catalog_json,
    stable_url, test_context,
};
