//! Deduplicated, in-flight-or-completed resolutions.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use mosaic_core::ResolutionResult;

use crate::loader::{LoadRequest, RemoteModule};

type SharedResolution = Shared<BoxFuture<'static, ResolutionResult<Arc<RemoteModule>>>>;

struct Slot {
    id: u64,
    resolution: SharedResolution,
}

/// At most one resolution per [`LoadRequest`].
///
/// Concurrent callers for the same key await one shared future. Successful
/// results stay cached; a failed resolution is evicted so the next caller
/// starts from scratch.
#[derive(Default)]
pub struct ResolutionCache {
    slots: DashMap<LoadRequest, Slot>,
    next_id: AtomicU64,
}

impl ResolutionCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Await the resolution for `request`, starting it with `start` if none
    /// is cached.
    ///
    /// # Errors
    ///
    /// Returns the shared resolution error.
    pub async fn resolve<F>(&self, request: &LoadRequest, start: F) -> ResolutionResult<Arc<RemoteModule>>
    where
        F: FnOnce() -> BoxFuture<'static, ResolutionResult<Arc<RemoteModule>>>,
    {
        let (id, resolution) = match self.slots.entry(request.clone()) {
            Entry::Occupied(slot) => (slot.get().id, slot.get().resolution.clone()),
            Entry::Vacant(vacant) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let resolution = start().shared();
                vacant.insert(Slot {
                    id,
                    resolution: resolution.clone(),
                });
                (id, resolution)
            },
        };

        let result = resolution.await;
        if result.is_err() {
            // A newer slot may already have replaced the failed one.
            self.slots.remove_if(request, |_, slot| slot.id == id);
        }
        result
    }

    /// Whether a resolution is cached for `request`.
    #[must_use]
    pub fn contains(&self, request: &LoadRequest) -> bool {
        self.slots.contains_key(request)
    }

    /// Drop the cached resolution for `request`.
    pub fn evict(&self, request: &LoadRequest) -> bool {
        self.slots.remove(request).is_some()
    }

    /// Number of cached resolutions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drop every cached resolution.
    pub fn clear(&self) {
        self.slots.clear();
    }
}

impl std::fmt::Debug for ResolutionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionCache")
            .field("slots", &self.slots.len())
            .finish_non_exhaustive()
    }
}
