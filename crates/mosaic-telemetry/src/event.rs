//! Telemetry event model.
//!
//! Field names are camelCase on the wire so records can be posted to the
//! registry's collector unchanged.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::{ClientContext, RequestIds};

/// Kind of remote-load outcome being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TelemetryEventType {
    /// A remote resolved (preferred variant or stable fallback).
    RemoteLoadSuccess,
    /// A canary failed and the stable fallback was attempted.
    RemoteLoadCanaryFailed,
    /// A remote failed terminally.
    RemoteLoadFailure,
}

impl TelemetryEventType {
    /// The level events of this type are reported at.
    #[must_use]
    pub fn level(self) -> TelemetryLevel {
        match self {
            Self::RemoteLoadSuccess => TelemetryLevel::Info,
            Self::RemoteLoadCanaryFailed => TelemetryLevel::Warn,
            Self::RemoteLoadFailure => TelemetryLevel::Error,
        }
    }
}

/// Severity of a telemetry event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TelemetryLevel {
    /// Informational.
    Info,
    /// Something degraded.
    Warn,
    /// Something failed.
    Error,
}

/// A telemetry event as produced by the resolution engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    /// Outcome kind.
    pub event_type: TelemetryEventType,
    /// Remote scope.
    pub remote_id: String,
    /// Route id.
    pub route_id: String,
    /// Severity.
    pub level: TelemetryLevel,
    /// Time since the resolution started.
    pub duration_ms: u64,
    /// Error message, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Free-form metadata (variant, version, attempts...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl TelemetryEvent {
    /// Create an event at the level implied by `event_type`.
    #[must_use]
    pub fn new(
        event_type: TelemetryEventType,
        remote_id: impl Into<String>,
        route_id: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            event_type,
            remote_id: remote_id.into(),
            route_id: route_id.into(),
            level: event_type.level(),
            duration_ms,
            message: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Attach an error message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A telemetry event stamped with session and request identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    /// When the record was created.
    pub timestamp: DateTime<Utc>,
    /// Correlation id.
    pub correlation_id: String,
    /// Request id.
    pub request_id: String,
    /// Session id.
    pub session_id: String,
    /// User id.
    pub user_id: String,
    /// The event itself.
    #[serde(flatten)]
    pub event: TelemetryEvent,
}

impl TelemetryRecord {
    /// Stamp `event` with the session in `ctx` and fresh request ids.
    #[must_use]
    pub fn new(event: TelemetryEvent, ctx: &ClientContext, ids: &RequestIds) -> Self {
        Self {
            timestamp: Utc::now(),
            correlation_id: ids.correlation_id.clone(),
            request_id: ids.request_id.clone(),
            session_id: ctx.session_id.clone(),
            user_id: ctx.user_id.clone(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_follows_event_type() {
        let event = TelemetryEvent::new(
            TelemetryEventType::RemoteLoadCanaryFailed,
            "remote_accounts",
            "accounts",
            120,
        );
        assert_eq!(event.level, TelemetryLevel::Warn);
    }

    #[test]
    fn test_wire_format() {
        let event = TelemetryEvent::new(
            TelemetryEventType::RemoteLoadFailure,
            "remote_billing",
            "billing",
            3_500,
        )
        .with_message("HTTP 503")
        .with_metadata("attemptedVariant", "stable");

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["eventType"], "REMOTE_LOAD_FAILURE");
        assert_eq!(json["remoteId"], "remote_billing");
        assert_eq!(json["level"], "ERROR");
        assert_eq!(json["durationMs"], 3_500);
        assert_eq!(json["metadata"]["attemptedVariant"], "stable");
    }

    #[test]
    fn test_record_is_flat() {
        let ctx = ClientContext::new("alice");
        let ids = ctx.request();
        let event = TelemetryEvent::new(
            TelemetryEventType::RemoteLoadSuccess,
            "remote_accounts",
            "accounts",
            40,
        );

        let record = TelemetryRecord::new(event, &ctx, &ids);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["userId"], "alice");
        assert_eq!(json["sessionId"], ctx.session_id);
        assert_eq!(json["requestId"], ids.request_id);
        assert_eq!(json["eventType"], "REMOTE_LOAD_SUCCESS");
        assert!(json.get("message").is_none());
    }
}
