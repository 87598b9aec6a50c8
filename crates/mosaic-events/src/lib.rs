//! Mosaic Events - session-scoped event bus for the Mosaic shell.
//!
//! This crate provides:
//! - Event types for catalog, status and session lifecycle changes
//! - Broadcast-based event bus for async subscribers
//! - Subscriber registry for synchronous handlers
//!
//! # Architecture
//!
//! The bus is owned by the composing shell and handed to collaborators by
//! handle. There is no process-global bus. There are two ways to subscribe:
//!
//! 1. **Async receivers**: Use `bus.subscribe()` to get an `EventReceiver`
//!    that can be polled asynchronously. Dropping it unsubscribes.
//!
//! 2. **Synchronous subscribers**: Register implementations of `EventSubscriber`
//!    with the registry. The returned `SubscriberId` is the unsubscribe handle.
//!
//! # Example
//!
//! ```rust
//! use mosaic_events::{EventBus, EventMetadata, MosaicEvent};
//!
//! # async fn example() {
//! let bus = EventBus::new();
//! let mut receiver = bus.subscribe();
//!
//! bus.publish(MosaicEvent::ShellStopped {
//!     metadata: EventMetadata::new("shell"),
//! });
//!
//! let event = receiver.recv().await.unwrap();
//! assert_eq!(event.event_type(), "shell_stopped");
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod bus;
mod event;
mod subscriber;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventReceiver};
pub use event::{CatalogOrigin, EventMetadata, MosaicEvent, ResolutionErrorInfo};
pub use subscriber::{
    EventFilter, EventSubscriber, FilterSubscriber, SubscriberId, SubscriberRegistry,
};
