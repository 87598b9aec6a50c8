//! Prelude module - commonly used types for convenient import.
//!
//! Use `use mosaic_core::prelude::*;` to import all essential types.

// Catalog model
pub use crate::{Catalog, RemoteConfig, RemoteTarget, Role, RolloutConfig, RouteDescriptor, Variant};

// Runtime status
pub use crate::{LoadState, RemoteStatus, StatusPatch};

// Resolution
pub use crate::{BackoffPolicy, ResolutionError, ResolutionResult};
