//! Prelude module - commonly used types for convenient import.
//!
//! Use `use mosaic_runtime::prelude::*;` to import all essential types.

// Session
pub use crate::{Shell, ShellBuilder};

// Resolution
pub use crate::{EngineConfig, ResolutionEngine, ResolvedRemote};

// Remote loading
pub use crate::{HttpRemoteLoader, LoadRequest, RemoteLoader, RemoteModule};

// Status
pub use crate::StatusRegistry;

// Errors
pub use crate::{RuntimeError, RuntimeResult};
