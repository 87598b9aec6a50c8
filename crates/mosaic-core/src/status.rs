//! Per-remote runtime status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{RouteDescriptor, Variant};

/// Lifecycle state of a remote within a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    /// Nothing has been attempted yet.
    #[default]
    Idle,
    /// A resolution attempt is in flight.
    Loading,
    /// A loadable reference was obtained.
    Loaded,
    /// Resolution failed terminally.
    Error,
}

impl LoadState {
    /// Lowercase name used in logs and tables.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Error => "error",
        }
    }
}

/// Runtime status of one remote scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStatus {
    /// Id of the route that owns the scope.
    pub id: String,
    /// Title of the route that owns the scope.
    pub title: String,
    /// Remote scope.
    pub scope: String,
    /// Version currently served (or expected).
    pub version: String,
    /// Variant currently served.
    pub variant: Variant,
    /// Lifecycle state.
    pub state: LoadState,
    /// Attempt index of the latest resolution.
    pub retry_count: u32,
    /// Set once a fallback or terminal failure occurred.
    pub degraded: bool,
    /// Latest error message, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the remote was last resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loaded_at: Option<DateTime<Utc>>,
}

impl RemoteStatus {
    /// The idle status seeded for a route when a catalog is applied.
    #[must_use]
    pub fn idle(route: &RouteDescriptor) -> Self {
        Self {
            id: route.id.clone(),
            title: route.title.clone(),
            scope: route.remote.scope.clone(),
            version: route.remote.stable.version.clone(),
            variant: Variant::Stable,
            state: LoadState::Idle,
            retry_count: 0,
            degraded: false,
            error: None,
            loaded_at: None,
        }
    }

    /// Whether the remote is degraded or failed.
    #[must_use]
    pub fn is_unhealthy(&self) -> bool {
        self.degraded || self.state == LoadState::Error
    }
}

/// A partial status update.
///
/// Only the fields that are `Some` are applied. `error` and `loaded_at` are
/// doubly optional so that a patch can explicitly clear them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusPatch {
    /// New version.
    pub version: Option<String>,
    /// New variant.
    pub variant: Option<Variant>,
    /// New lifecycle state.
    pub state: Option<LoadState>,
    /// New attempt index.
    pub retry_count: Option<u32>,
    /// New degraded flag.
    pub degraded: Option<bool>,
    /// New error (`Some(None)` clears it).
    pub error: Option<Option<String>>,
    /// New load timestamp (`Some(None)` clears it).
    pub loaded_at: Option<Option<DateTime<Utc>>>,
}

impl StatusPatch {
    /// An attempt is starting.
    #[must_use]
    pub fn loading(attempt: u32) -> Self {
        Self {
            state: Some(LoadState::Loading),
            retry_count: Some(attempt),
            degraded: Some(false),
            error: Some(None),
            ..Self::default()
        }
    }

    /// The remote resolved.
    #[must_use]
    pub fn loaded(
        version: impl Into<String>,
        variant: Variant,
        attempt: u32,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            version: Some(version.into()),
            variant: Some(variant),
            state: Some(LoadState::Loaded),
            retry_count: Some(attempt),
            degraded: Some(false),
            error: Some(None),
            loaded_at: Some(Some(at)),
        }
    }

    /// The remote failed terminally.
    #[must_use]
    pub fn failed(error: impl Into<String>, attempt: u32) -> Self {
        Self {
            state: Some(LoadState::Error),
            retry_count: Some(attempt),
            degraded: Some(true),
            error: Some(Some(error.into())),
            ..Self::default()
        }
    }

    /// Mark the update as degraded with an explanatory error.
    #[must_use]
    pub fn with_degraded(mut self, error: impl Into<String>) -> Self {
        self.degraded = Some(true);
        self.error = Some(Some(error.into()));
        self
    }

    /// Whether applying this patch to `current` would change any field.
    #[must_use]
    pub fn changes(&self, current: &RemoteStatus) -> bool {
        fn differs<T: PartialEq>(field: Option<&T>, current: &T) -> bool {
            field.is_some_and(|value| value != current)
        }

        differs(self.version.as_ref(), &current.version)
            || differs(self.variant.as_ref(), &current.variant)
            || differs(self.state.as_ref(), &current.state)
            || differs(self.retry_count.as_ref(), &current.retry_count)
            || differs(self.degraded.as_ref(), &current.degraded)
            || differs(self.error.as_ref(), &current.error)
            || differs(self.loaded_at.as_ref(), &current.loaded_at)
    }

    /// Shallow-merge this patch into `status`.
    pub fn apply_to(self, status: &mut RemoteStatus) {
        if let Some(version) = self.version {
            status.version = version;
        }
        if let Some(variant) = self.variant {
            status.variant = variant;
        }
        if let Some(state) = self.state {
            status.state = state;
        }
        if let Some(retry_count) = self.retry_count {
            status.retry_count = retry_count;
        }
        if let Some(degraded) = self.degraded {
            status.degraded = degraded;
        }
        if let Some(error) = self.error {
            status.error = error;
        }
        if let Some(loaded_at) = self.loaded_at {
            status.loaded_at = loaded_at;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status() -> RemoteStatus {
        RemoteStatus {
            id: "accounts".to_string(),
            title: "Accounts".to_string(),
            scope: "remote_accounts".to_string(),
            version: "1.0.0".to_string(),
            variant: Variant::Stable,
            state: LoadState::Idle,
            retry_count: 0,
            degraded: false,
            error: None,
            loaded_at: None,
        }
    }

    #[test]
    fn test_empty_patch_changes_nothing() {
        assert!(!StatusPatch::default().changes(&status()));
    }

    #[test]
    fn test_identical_fields_do_not_count_as_change() {
        let patch = StatusPatch {
            state: Some(LoadState::Idle),
            degraded: Some(false),
            error: Some(None),
            ..StatusPatch::default()
        };
        assert!(!patch.changes(&status()));
    }

    #[test]
    fn test_single_differing_field_is_a_change() {
        let patch = StatusPatch::loading(0);
        assert!(patch.changes(&status()));

        let mut current = status();
        patch.apply_to(&mut current);
        assert_eq!(current.state, LoadState::Loading);
        assert!(!StatusPatch::loading(0).changes(&current));
    }

    #[test]
    fn test_failed_patch_sets_degraded_and_error() {
        let mut current = status();
        StatusPatch::failed("boom", 3).apply_to(&mut current);

        assert_eq!(current.state, LoadState::Error);
        assert!(current.degraded);
        assert_eq!(current.retry_count, 3);
        assert_eq!(current.error.as_deref(), Some("boom"));
        assert!(current.is_unhealthy());
    }

    #[test]
    fn test_loaded_patch_clears_error() {
        let mut current = status();
        current.error = Some("old".to_string());

        StatusPatch::loaded("1.1.0", Variant::Canary, 1, Utc::now()).apply_to(&mut current);

        assert_eq!(current.error, None);
        assert_eq!(current.variant, Variant::Canary);
        assert!(current.loaded_at.is_some());
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let json = serde_json::to_value(status()).unwrap();
        assert_eq!(json["retryCount"], 0);
        assert_eq!(json["state"], "idle");
        assert!(json.get("error").is_none());
    }
}
