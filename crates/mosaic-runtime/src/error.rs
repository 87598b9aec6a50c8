//! Runtime error types.

use thiserror::Error;

use mosaic_core::ResolutionError;
use mosaic_manifest::CatalogError;
use mosaic_telemetry::TelemetryError;

/// Errors from the shell session and its wiring.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// No catalog has been applied yet.
    #[error("No catalog loaded")]
    CatalogNotLoaded,

    /// The route id is not in the current catalog.
    #[error("Unknown route: {0}")]
    UnknownRoute(String),

    /// Loading the catalog failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Resolving a remote failed terminally.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// A telemetry sink could not be built.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// Building a collaborator from configuration failed.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
