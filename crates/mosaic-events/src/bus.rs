//! Event bus for broadcasting shell events to subscribers.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::event::MosaicEvent;
use crate::subscriber::{EventSubscriber, FilterSubscriber, SubscriberId, SubscriberRegistry};

/// Default channel capacity for the event bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Event bus for broadcasting events to all subscribers.
///
/// Events are delivered to async receivers in publish order. Synchronous
/// subscribers are shared across clones of the bus.
///
/// **WARNING:** Storing a cloned `EventBus` inside a synchronous subscriber
/// creates an `Arc` reference cycle. Communicate through a separate channel
/// if a subscriber needs to publish.
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<MosaicEvent>>,
    registry: Arc<SubscriberRegistry>,
    capacity: usize,
}

impl EventBus {
    /// Create a new event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new event bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            registry: Arc::new(SubscriberRegistry::new()),
            capacity: capacity.max(1),
        }
    }

    /// Publish an event to all subscribers.
    ///
    /// Returns the number of async receivers that received the event.
    pub fn publish(&self, event: MosaicEvent) -> usize {
        let event = Arc::new(event);

        trace!(event_type = %event.event_type(), "Publishing event");

        let count = if let Ok(c) = self.sender.send(Arc::clone(&event)) {
            debug!(
                event_type = %event.event_type(),
                receiver_count = c,
                "Event published"
            );
            c
        } else {
            trace!(event_type = %event.event_type(), "No receivers for event");
            0
        };

        self.registry.notify(&event);

        count
    }

    /// Subscribe to all events. Dropping the receiver unsubscribes.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe(), None)
    }

    /// Subscribe to events concerning a single remote scope.
    ///
    /// Events without a scope (catalog and lifecycle events) are skipped.
    #[must_use]
    pub fn subscribe_scope(&self, scope: impl Into<String>) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe(), Some(scope.into()))
    }

    /// Register a synchronous subscriber.
    pub fn register(&self, subscriber: Arc<dyn EventSubscriber>) -> SubscriberId {
        self.registry.register(subscriber)
    }

    /// Register a closure as a synchronous subscriber.
    pub fn subscribe_fn<F>(&self, name: impl Into<String>, handler: F) -> SubscriberId
    where
        F: Fn(&MosaicEvent) + Send + Sync + 'static,
    {
        self.registry
            .register(Arc::new(FilterSubscriber::new(name, handler)))
    }

    /// Remove a synchronous subscriber. Returns `true` if it was registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.registry.unregister(id)
    }

    /// Get the synchronous subscriber registry.
    #[must_use]
    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    /// Get the current number of active subscribers (both async and synchronous).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender
            .receiver_count()
            .saturating_add(self.registry.len())
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            registry: Arc::clone(&self.registry),
            capacity: self.capacity,
        }
    }
}

/// Receiver for events from the event bus.
pub struct EventReceiver {
    receiver: broadcast::Receiver<Arc<MosaicEvent>>,
    scope: Option<String>,
}

impl EventReceiver {
    fn new(receiver: broadcast::Receiver<Arc<MosaicEvent>>, scope: Option<String>) -> Self {
        Self { receiver, scope }
    }

    fn matches(&self, event: &MosaicEvent) -> bool {
        match &self.scope {
            None => true,
            Some(scope) => event.scope() == Some(scope.as_str()),
        }
    }

    /// Receive the next event.
    ///
    /// Returns `None` once every sender has been dropped. Lagged events are
    /// logged and skipped.
    pub async fn recv(&mut self) -> Option<Arc<MosaicEvent>> {
        let mut skipped: usize = 0;
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(event);
                    }
                    skipped = skipped.wrapping_add(1);
                    if skipped.is_multiple_of(100) {
                        tokio::task::yield_now().await;
                    }
                },
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(skipped = count, "Event receiver lagged, events dropped");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive the next event without blocking.
    pub fn try_recv(&mut self) -> Option<Arc<MosaicEvent>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(event);
                    }
                },
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    warn!(skipped = count, "Event receiver lagged, events dropped");
                },
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventMetadata;
    use mosaic_core::{LoadState, RemoteStatus, Variant};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn status_changed(scope: &str) -> MosaicEvent {
        MosaicEvent::StatusChanged {
            metadata: EventMetadata::new("test"),
            scope: scope.to_string(),
            status: RemoteStatus {
                id: "accounts".to_string(),
                title: "Accounts".to_string(),
                scope: scope.to_string(),
                version: "1.0.0".to_string(),
                variant: Variant::Stable,
                state: LoadState::Loading,
                retry_count: 0,
                degraded: false,
                error: None,
                loaded_at: None,
            },
        }
    }

    #[tokio::test]
    async fn test_event_bus_creation() {
        let bus = EventBus::new();
        assert_eq!(bus.capacity(), DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_publish_and_receive() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        let delivered = bus.publish(MosaicEvent::ShellStarted {
            metadata: EventMetadata::new("test"),
        });
        assert_eq!(delivered, 1);

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.event_type(), "shell_started");
    }

    #[tokio::test]
    async fn test_publish_without_receivers() {
        let bus = EventBus::new();
        let delivered = bus.publish(MosaicEvent::ShellStopped {
            metadata: EventMetadata::new("test"),
        });
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_scope_subscription_filters() {
        let bus = EventBus::new();
        let mut accounts = bus.subscribe_scope("remote_accounts");

        bus.publish(MosaicEvent::ShellStarted {
            metadata: EventMetadata::new("test"),
        });
        bus.publish(status_changed("remote_billing"));
        bus.publish(status_changed("remote_accounts"));

        let event = accounts.try_recv().unwrap();
        assert_eq!(event.scope(), Some("remote_accounts"));
        assert!(accounts.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_synchronous_subscriber_and_unsubscribe() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let id = bus.subscribe_fn("counter", move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(status_changed("remote_accounts"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        assert!(bus.unsubscribe(id));
        bus.publish(status_changed("remote_accounts"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clones_share_subscribers() {
        let bus = EventBus::new();
        let clone = bus.clone();
        let mut receiver = bus.subscribe();

        clone.publish(MosaicEvent::ShellStopped {
            metadata: EventMetadata::new("test"),
        });

        assert!(receiver.try_recv().is_some());
    }

    #[tokio::test]
    async fn test_lagged_receiver_keeps_receiving() {
        let bus = EventBus::with_capacity(2);
        let mut receiver = bus.subscribe();

        for _ in 0..5 {
            bus.publish(status_changed("remote_accounts"));
        }

        assert!(receiver.try_recv().is_some());
    }

    #[tokio::test]
    async fn test_dropped_receiver_unsubscribes() {
        let bus = EventBus::new();
        let receiver = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(receiver);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
