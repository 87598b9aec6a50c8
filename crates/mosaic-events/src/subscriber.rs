//! Event subscriber trait and registry.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::event::MosaicEvent;

/// Filter function type for event subscribers.
pub type EventFilter = Box<dyn Fn(&MosaicEvent) -> bool + Send + Sync>;

/// Trait for synchronous event subscribers.
///
/// Subscribers should not perform heavy work in `on_event`, it runs on the
/// publishing task.
pub trait EventSubscriber: Send + Sync {
    /// Called when an event is published.
    fn on_event(&self, event: &MosaicEvent);

    /// Optional filter for event types.
    ///
    /// Return `true` to receive the event, `false` to skip it.
    /// Default implementation accepts all events.
    fn accepts(&self, event: &MosaicEvent) -> bool {
        let _ = event;
        true
    }

    /// Optional name for debugging.
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// Registration handle for a subscriber; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

type SubscriberMap = HashMap<SubscriberId, Arc<dyn EventSubscriber>>;

/// Registry for managing synchronous event subscribers.
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: RwLock<SubscriberMap>,
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("subscriber_count", &self.len())
            .finish()
    }
}

impl SubscriberRegistry {
    /// Create a new subscriber registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a subscriber.
    ///
    /// Returns a handle that can be used to unregister the subscriber.
    pub fn register(&self, subscriber: Arc<dyn EventSubscriber>) -> SubscriberId {
        let id = SubscriberId::new();
        let name = subscriber.name().to_string();

        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, subscriber);

        debug!(subscriber_name = %name, "Subscriber registered");
        id
    }

    /// Unregister a subscriber.
    ///
    /// Returns `true` if the subscriber was found and removed.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        // Drop the subscriber after releasing the lock so its destructor may
        // publish without deadlocking.
        let removed = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);

        if removed.is_some() {
            debug!("Subscriber unregistered");
        }

        removed.is_some()
    }

    /// Notify all subscribers of an event.
    ///
    /// Subscribers are snapshotted first, so a handler may register or
    /// unregister subscribers while being notified.
    pub fn notify(&self, event: &MosaicEvent) {
        let snapshot: Vec<(SubscriberId, Arc<dyn EventSubscriber>)> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, subscriber)| (*id, Arc::clone(subscriber)))
            .collect();

        for (id, subscriber) in snapshot {
            if !subscriber.accepts(event) {
                continue;
            }

            trace!(
                subscriber_name = %subscriber.name(),
                event_type = %event.event_type(),
                "Notifying subscriber"
            );

            // One panicking subscriber must not starve the others.
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                subscriber.on_event(event);
            }));

            if let Err(e) = result {
                warn!(
                    subscriber_id = ?id,
                    subscriber_name = %subscriber.name(),
                    error = ?e,
                    "Subscriber panicked"
                );
            }
        }
    }

    /// Get the number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all subscribers.
    pub fn clear(&self) {
        let drained: SubscriberMap = std::mem::take(
            &mut *self
                .subscribers
                .write()
                .unwrap_or_else(PoisonError::into_inner),
        );
        debug!(count = drained.len(), "All subscribers cleared");
        drop(drained);
    }
}

/// A simple filter-based subscriber.
pub struct FilterSubscriber<F>
where
    F: Fn(&MosaicEvent) + Send + Sync,
{
    name: String,
    filter: Option<EventFilter>,
    handler: F,
}

impl<F> FilterSubscriber<F>
where
    F: Fn(&MosaicEvent) + Send + Sync,
{
    /// Create a new filter subscriber.
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            filter: None,
            handler,
        }
    }

    /// Add a filter to this subscriber.
    #[must_use]
    pub fn with_filter<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&MosaicEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }
}

impl<F> EventSubscriber for FilterSubscriber<F>
where
    F: Fn(&MosaicEvent) + Send + Sync,
{
    fn on_event(&self, event: &MosaicEvent) {
        (self.handler)(event);
    }

    fn accepts(&self, event: &MosaicEvent) -> bool {
        match &self.filter {
            Some(f) => f(event),
            None => true,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
