//! Telemetry sinks.
//!
//! Emission is fire-and-forget: a sink never reports delivery failure to its
//! caller, so telemetry can not change a resolution outcome.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tracing::{debug, trace};

use crate::context::ClientContext;
use crate::error::TelemetryResult;
use crate::event::{TelemetryEvent, TelemetryRecord};

/// Number of records a [`MemoryTelemetrySink`] keeps by default.
pub const DEFAULT_BUFFER_SIZE: usize = 500;

/// Default timeout for a single telemetry POST.
pub const DEFAULT_POST_TIMEOUT: Duration = Duration::from_secs(5);

/// Destination for telemetry events.
pub trait TelemetrySink: Send + Sync {
    /// Record an event for the session in `ctx`. Must not block.
    fn emit(&self, ctx: &ClientContext, event: TelemetryEvent);
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetrySink;

impl TelemetrySink for NoopTelemetrySink {
    fn emit(&self, _ctx: &ClientContext, event: TelemetryEvent) {
        trace!(event_type = ?event.event_type, "Telemetry disabled, event dropped");
    }
}

/// In-memory sink keeping the most recent records, newest first.
#[derive(Debug)]
pub struct MemoryTelemetrySink {
    records: Mutex<VecDeque<TelemetryRecord>>,
    capacity: usize,
}

impl MemoryTelemetrySink {
    /// Create a sink holding [`DEFAULT_BUFFER_SIZE`] records.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    /// Create a sink holding at most `capacity` records.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_BUFFER_SIZE))),
            capacity: capacity.max(1),
        }
    }

    /// Snapshot of the stored records, newest first.
    #[must_use]
    pub fn records(&self) -> Vec<TelemetryRecord> {
        self.lock().iter().cloned().collect()
    }

    /// Stored events, newest first, without the session stamp.
    #[must_use]
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.lock().iter().map(|r| r.event.clone()).collect()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no record is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all stored records.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<TelemetryRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryTelemetrySink {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySink for MemoryTelemetrySink {
    fn emit(&self, ctx: &ClientContext, event: TelemetryEvent) {
        let record = TelemetryRecord::new(event, ctx, &ctx.request());
        let mut records = self.lock();
        records.push_front(record);
        records.truncate(self.capacity);
    }
}

/// Sink that POSTs each record as JSON to a collector endpoint.
///
/// Each POST runs on its own spawned task. Without a Tokio runtime the event
/// is dropped.
#[derive(Debug, Clone)]
pub struct HttpTelemetrySink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTelemetrySink {
    /// Create a sink posting to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>) -> TelemetryResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_POST_TIMEOUT)
            .user_agent(concat!("mosaic/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, endpoint))
    }

    /// Create a sink with a preconfigured client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// The collector endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl TelemetrySink for HttpTelemetrySink {
    fn emit(&self, ctx: &ClientContext, event: TelemetryEvent) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!(event_type = ?event.event_type, "No runtime, telemetry event dropped");
            return;
        };

        let ids = ctx.request();
        let mut request = self.client.post(&self.endpoint).json(&event);
        for (name, value) in ctx.headers(&ids) {
            request = request.header(name, value);
        }
        let event_type = event.event_type;

        handle.spawn(async move {
            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    trace!(?event_type, "Telemetry delivered");
                },
                Ok(response) => {
                    debug!(?event_type, status = %response.status(), "Telemetry rejected");
                },
                Err(e) => {
                    debug!(?event_type, error = %e, "Telemetry delivery failed");
                },
            }
        });
    }
}
