//! Prelude module - commonly used types for convenient import.
//!
//! Use `use mosaic_telemetry::prelude::*;` to import all essential types.

// Errors
pub use crate::{TelemetryError, TelemetryResult};

// Logging
pub use crate::{LogConfig, LogFormat, LogTarget, setup_logging};

// Context
pub use crate::{ClientContext, RequestIds};

// Events and sinks
pub use crate::{
    HttpTelemetrySink, MemoryTelemetrySink, NoopTelemetrySink, TelemetryEvent,
    TelemetryEventType, TelemetryLevel, TelemetrySink,
};
