//! Per-scope runtime status with no-op suppression.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tracing::trace;

use mosaic_core::{RemoteStatus, RouteDescriptor, StatusPatch};
use mosaic_events::{EventBus, EventMetadata, MosaicEvent};

const EVENT_SOURCE: &str = "status_registry";

#[derive(Debug, Default)]
struct Entries {
    by_scope: HashMap<String, RemoteStatus>,
    order: Vec<String>,
}

/// Status of every remote scope seen in this session.
///
/// Entries are never removed. Every effective change is published on the
/// bus as [`MosaicEvent::StatusChanged`]; updates that change nothing are
/// dropped without notification.
#[derive(Debug)]
pub struct StatusRegistry {
    entries: RwLock<Entries>,
    bus: EventBus,
}

impl StatusRegistry {
    /// Create an empty registry publishing to `bus`.
    #[must_use]
    pub fn new(bus: EventBus) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            bus,
        }
    }

    /// Seed an idle entry for every scope in `routes` that has none yet.
    ///
    /// Existing entries are left untouched. Returns the newly seeded scopes.
    pub fn initialize(&self, routes: &[RouteDescriptor]) -> Vec<String> {
        let seeded = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            let mut seeded = Vec::new();
            for route in routes {
                let scope = &route.remote.scope;
                if entries.by_scope.contains_key(scope) {
                    continue;
                }
                entries
                    .by_scope
                    .insert(scope.clone(), RemoteStatus::idle(route));
                entries.order.push(scope.clone());
                seeded.push(scope.clone());
            }
            seeded
        };

        if !seeded.is_empty() {
            self.bus.publish(MosaicEvent::StatusSeeded {
                metadata: EventMetadata::new(EVENT_SOURCE),
                scopes: seeded.clone(),
            });
        }
        seeded
    }

    /// Shallow-merge `patch` into the status of `scope`.
    ///
    /// Returns `true` if a field changed. Unknown scopes are ignored.
    pub fn update(&self, scope: &str, patch: StatusPatch) -> bool {
        let updated = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            let Some(current) = entries.by_scope.get_mut(scope) else {
                trace!(scope, "Status update for unknown scope ignored");
                return false;
            };
            if !patch.changes(current) {
                return false;
            }
            patch.apply_to(current);
            current.clone()
        };

        self.bus.publish(MosaicEvent::StatusChanged {
            metadata: EventMetadata::new(EVENT_SOURCE),
            scope: scope.to_owned(),
            status: updated,
        });
        true
    }

    /// Current status of `scope`.
    #[must_use]
    pub fn get(&self, scope: &str) -> Option<RemoteStatus> {
        self.read().by_scope.get(scope).cloned()
    }

    /// All statuses in the order their scopes were first seen.
    #[must_use]
    pub fn list(&self) -> Vec<RemoteStatus> {
        let entries = self.read();
        entries
            .order
            .iter()
            .filter_map(|scope| entries.by_scope.get(scope).cloned())
            .collect()
    }

    /// Whether any remote is degraded or failed.
    #[must_use]
    pub fn has_degraded_remote(&self) -> bool {
        self.read().by_scope.values().any(RemoteStatus::is_unhealthy)
    }

    /// Number of tracked scopes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().order.len()
    }

    /// Whether no scope is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mosaic_core::{LoadState, RemoteConfig, RemoteTarget, RolloutConfig, Variant};

    fn route(id: &str, scope: &str, stable_version: &str) -> RouteDescriptor {
        let target = |version: &str| RemoteTarget {
            url: format!("http://localhost/{scope}/assets/remoteEntry.js"),
            version: version.to_owned(),
        };
        RouteDescriptor {
            id: id.to_owned(),
            title: id.to_uppercase(),
            path: format!("/{id}"),
            required_roles: Vec::new(),
            remote: RemoteConfig {
                scope: scope.to_owned(),
                module: "./routes".to_owned(),
                stable: target(stable_version),
                canary: target("9.9.9"),
                rollout: RolloutConfig {
                    canary_enabled: false,
                    canary_percentage: 0.0,
                },
            },
        }
    }

    fn registry() -> (StatusRegistry, EventBus) {
        let bus = EventBus::new();
        (StatusRegistry::new(bus.clone()), bus)
    }

    #[test]
    fn test_initialize_seeds_idle() {
        let (registry, _) = registry();
        let seeded = registry.initialize(&[route("accounts", "remote_accounts", "1.0.0")]);

        assert_eq!(seeded, vec!["remote_accounts".to_string()]);
        let status = registry.get("remote_accounts").unwrap();
        assert_eq!(status.state, LoadState::Idle);
        assert_eq!(status.version, "1.0.0");
        assert_eq!(status.variant, Variant::Stable);
    }

    #[test]
    fn test_initialize_does_not_clobber() {
        let (registry, _) = registry();
        registry.initialize(&[route("accounts", "remote_accounts", "1.0.0")]);
        registry.update("remote_accounts", StatusPatch::failed("boom", 2));

        let seeded = registry.initialize(&[
            route("accounts", "remote_accounts", "2.0.0"),
            route("billing", "remote_billing", "1.0.0"),
        ]);

        assert_eq!(seeded, vec!["remote_billing".to_string()]);
        let accounts = registry.get("remote_accounts").unwrap();
        assert_eq!(accounts.state, LoadState::Error);
        assert_eq!(accounts.version, "1.0.0");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_identical_update_is_suppressed() {
        let (registry, bus) = registry();
        registry.initialize(&[route("accounts", "remote_accounts", "1.0.0")]);
        let mut receiver = bus.subscribe();

        assert!(registry.update("remote_accounts", StatusPatch::loading(0)));
        assert!(!registry.update("remote_accounts", StatusPatch::loading(0)));

        let first = receiver.try_recv().unwrap();
        assert_eq!(first.event_type(), "status_changed");
        assert!(receiver.try_recv().is_none());
    }

    #[test]
    fn test_full_status_echo_is_suppressed() {
        let (registry, bus) = registry();
        registry.initialize(&[route("accounts", "remote_accounts", "1.0.0")]);
        registry.update(
            "remote_accounts",
            StatusPatch::loaded("1.0.0", Variant::Stable, 0, Utc::now()),
        );
        let current = registry.get("remote_accounts").unwrap();
        let mut receiver = bus.subscribe();

        let echo = StatusPatch {
            version: Some(current.version.clone()),
            variant: Some(current.variant),
            state: Some(current.state),
            retry_count: Some(current.retry_count),
            degraded: Some(current.degraded),
            error: Some(current.error.clone()),
            loaded_at: Some(current.loaded_at),
        };
        assert!(!registry.update("remote_accounts", echo));
        assert!(receiver.try_recv().is_none());
    }

    #[test]
    fn test_unknown_scope_is_noop() {
        let (registry, _) = registry();
        assert!(!registry.update("remote_ghost", StatusPatch::loading(0)));
        assert!(registry.get("remote_ghost").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_list_keeps_catalog_order() {
        let (registry, _) = registry();
        registry.initialize(&[
            route("zeta", "remote_zeta", "1.0.0"),
            route("alpha", "remote_alpha", "1.0.0"),
        ]);

        let scopes: Vec<_> = registry.list().into_iter().map(|s| s.scope).collect();
        assert_eq!(scopes, vec!["remote_zeta", "remote_alpha"]);
    }

    #[test]
    fn test_has_degraded_remote() {
        let (registry, _) = registry();
        registry.initialize(&[route("accounts", "remote_accounts", "1.0.0")]);
        assert!(!registry.has_degraded_remote());

        registry.update("remote_accounts", StatusPatch::failed("boom", 0));
        assert!(registry.has_degraded_remote());
    }
}
