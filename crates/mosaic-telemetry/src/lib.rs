//! Mosaic Telemetry - logging, client context and telemetry sinks.
//!
//! This crate provides:
//! - Configurable logging setup with multiple formats and a rolling file target
//! - Session and request identity for correlating logs and outgoing calls
//! - The remote-load telemetry event model and its sinks
//!
//! # Example
//!
//! ```rust,no_run
//! use mosaic_telemetry::{
//!     ClientContext, LogConfig, LogFormat, MemoryTelemetrySink, TelemetryEvent,
//!     TelemetryEventType, TelemetrySink, setup_logging,
//! };
//!
//! # fn main() -> Result<(), mosaic_telemetry::TelemetryError> {
//! setup_logging(&LogConfig::new("debug").with_format(LogFormat::Json))?;
//!
//! let ctx = ClientContext::new("alice");
//! let sink = MemoryTelemetrySink::new();
//! sink.emit(
//!     &ctx,
//!     TelemetryEvent::new(TelemetryEventType::RemoteLoadSuccess, "remote_accounts", "accounts", 42),
//! );
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod context;
mod error;
mod event;
mod logging;
mod sink;

pub use context::{ANONYMOUS_USER, ClientContext, RequestIds, new_request_id};
pub use error::{TelemetryError, TelemetryResult};
pub use event::{TelemetryEvent, TelemetryEventType, TelemetryLevel, TelemetryRecord};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
pub use sink::{
    DEFAULT_BUFFER_SIZE, DEFAULT_POST_TIMEOUT, HttpTelemetrySink, MemoryTelemetrySink,
    NoopTelemetrySink, TelemetrySink,
};
