//! Prelude module - commonly used types for convenient import.
//!
//! Use `use mosaic_events::prelude::*;` to import all essential types.

// Event bus
pub use crate::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventReceiver};

// Events
pub use crate::{CatalogOrigin, EventMetadata, MosaicEvent, ResolutionErrorInfo};

// Subscriber system
pub use crate::{EventFilter, EventSubscriber, FilterSubscriber, SubscriberId, SubscriberRegistry};
