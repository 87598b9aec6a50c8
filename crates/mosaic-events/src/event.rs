//! Event types for the Mosaic event bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mosaic_core::{RemoteStatus, ResolutionError, Variant};

/// Metadata attached to every event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// When the event was created.
    pub timestamp: DateTime<Utc>,
    /// Correlation ID for tracing related events.
    pub correlation_id: Option<Uuid>,
    /// Shell session the event belongs to.
    pub session_id: Option<String>,
    /// User the session belongs to.
    pub user_id: Option<String>,
    /// Source component that generated the event.
    pub source: String,
}

impl EventMetadata {
    /// Create new event metadata.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            correlation_id: None,
            session_id: None,
            user_id: None,
            source: source.into(),
        }
    }

    /// Set correlation ID.
    #[must_use]
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// Set session ID.
    #[must_use]
    pub fn with_session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    /// Set user ID.
    #[must_use]
    pub fn with_user_id(mut self, id: impl Into<String>) -> Self {
        self.user_id = Some(id.into());
        self
    }
}

impl Default for EventMetadata {
    fn default() -> Self {
        Self::new("unknown")
    }
}

/// Where an applied catalog came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogOrigin {
    /// Freshly fetched from the registry.
    Live,
    /// Last-known-good copy from the manifest cache.
    Cache,
}

/// All events that can occur in a shell session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MosaicEvent {
    // ========== Session Lifecycle ==========
    /// A shell session started.
    ShellStarted {
        /// Event metadata.
        metadata: EventMetadata,
    },

    /// A shell session was torn down.
    ShellStopped {
        /// Event metadata.
        metadata: EventMetadata,
    },

    // ========== Catalog ==========
    /// A validated catalog was applied.
    CatalogLoaded {
        /// Event metadata.
        metadata: EventMetadata,
        /// Platform name.
        platform: String,
        /// Number of routes.
        route_count: usize,
        /// Live fetch or cache fallback.
        origin: CatalogOrigin,
    },

    /// Neither the registry nor the cache produced a catalog.
    CatalogUnavailable {
        /// Event metadata.
        metadata: EventMetadata,
        /// Why the registry fetch failed.
        reason: String,
    },

    // ========== Remote Status ==========
    /// Scopes were seeded in the status registry.
    StatusSeeded {
        /// Event metadata.
        metadata: EventMetadata,
        /// Scopes that did not exist before.
        scopes: Vec<String>,
    },

    /// A remote's runtime status changed.
    StatusChanged {
        /// Event metadata.
        metadata: EventMetadata,
        /// Remote scope.
        scope: String,
        /// Status after the change.
        status: RemoteStatus,
    },

    // ========== Resolution ==========
    /// A remote resolved (possibly through the stable fallback).
    RemoteResolved {
        /// Event metadata.
        metadata: EventMetadata,
        /// Route id.
        route_id: String,
        /// Remote scope.
        scope: String,
        /// Variant that was served.
        variant: Variant,
        /// Whether the preferred variant was bypassed.
        degraded: bool,
    },

    /// A remote failed terminally.
    RemoteFailed {
        /// Event metadata.
        metadata: EventMetadata,
        /// Route id.
        route_id: String,
        /// Remote scope.
        scope: String,
        /// Terminal error.
        error: ResolutionErrorInfo,
    },
}

/// Serializable summary of a [`ResolutionError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionErrorInfo {
    /// Error kind (`timeout`, `not_found`, ...).
    pub kind: String,
    /// Display message.
    pub message: String,
}

impl From<&ResolutionError> for ResolutionErrorInfo {
    fn from(error: &ResolutionError) -> Self {
        Self {
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

impl MosaicEvent {
    /// Get the event metadata.
    #[must_use]
    pub fn metadata(&self) -> &EventMetadata {
        match self {
            Self::ShellStarted { metadata }
            | Self::ShellStopped { metadata }
            | Self::CatalogLoaded { metadata, .. }
            | Self::CatalogUnavailable { metadata, .. }
            | Self::StatusSeeded { metadata, .. }
            | Self::StatusChanged { metadata, .. }
            | Self::RemoteResolved { metadata, .. }
            | Self::RemoteFailed { metadata, .. } => metadata,
        }
    }

    /// Get the event type name.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ShellStarted { .. } => "shell_started",
            Self::ShellStopped { .. } => "shell_stopped",
            Self::CatalogLoaded { .. } => "catalog_loaded",
            Self::CatalogUnavailable { .. } => "catalog_unavailable",
            Self::StatusSeeded { .. } => "status_seeded",
            Self::StatusChanged { .. } => "status_changed",
            Self::RemoteResolved { .. } => "remote_resolved",
            Self::RemoteFailed { .. } => "remote_failed",
        }
    }

    /// The remote scope this event concerns, if any.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        match self {
            Self::StatusChanged { scope, .. }
            | Self::RemoteResolved { scope, .. }
            | Self::RemoteFailed { scope, .. } => Some(scope),
            _ => None,
        }
    }
}
