//! Mock implementations for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use mosaic_core::{ResolutionError, ResolutionResult};
use mosaic_manifest::{CatalogError, CatalogResult, CatalogSource};
use mosaic_runtime::{LoadRequest, RemoteLoader, RemoteModule};
use mosaic_telemetry::ClientContext;

/// What a [`MockRemoteLoader`] does for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOutcome {
    /// Resolve successfully.
    Ok,
    /// Fail with [`ResolutionError::NotFound`].
    NotFound,
    /// Fail with [`ResolutionError::Transient`] carrying the message.
    Transient(String),
    /// Never complete.
    Hang,
}

impl MockOutcome {
    /// A transient failure with a generic message.
    #[must_use]
    pub fn transient() -> Self {
        Self::Transient("HTTP 503".into())
    }
}

#[derive(Debug, Default)]
struct Script {
    queued: HashMap<String, VecDeque<MockOutcome>>,
    fixed: HashMap<String, MockOutcome>,
}

/// Scripted implementation of [`RemoteLoader`].
///
/// Every URL resolves unless scripted otherwise. Queued outcomes are consumed
/// first, then the fixed outcome for the URL applies. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockRemoteLoader {
    script: Arc<Mutex<Script>>,
    calls: Arc<Mutex<Vec<String>>>,
    latency: Option<Duration>,
}

impl MockRemoteLoader {
    /// Create a loader that resolves every URL.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Answer every call for `url` with `outcome` once the queue is empty.
    pub fn set_outcome(&self, url: impl Into<String>, outcome: MockOutcome) {
        self.lock_script().fixed.insert(url.into(), outcome);
    }

    /// Queue one-shot outcomes for `url`, consumed in order.
    pub fn queue_outcomes(&self, url: impl Into<String>, outcomes: impl IntoIterator<Item = MockOutcome>) {
        self.lock_script()
            .queued
            .entry(url.into())
            .or_default()
            .extend(outcomes);
    }

    /// Every requested URL, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of calls for `url`.
    #[must_use]
    pub fn call_count(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|called| called.as_str() == url)
            .count()
    }

    /// Number of calls for any URL.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_outcome(&self, url: &str) -> MockOutcome {
        let mut script = self.lock_script();
        if let Some(outcome) = script.queued.get_mut(url).and_then(VecDeque::pop_front) {
            return outcome;
        }
        script.fixed.get(url).cloned().unwrap_or(MockOutcome::Ok)
    }
}

#[async_trait]
impl RemoteLoader for MockRemoteLoader {
    async fn load(&self, request: &LoadRequest) -> ResolutionResult<RemoteModule> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.url.clone());
        let outcome = self.next_outcome(&request.url);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match outcome {
            MockOutcome::Ok => Ok(RemoteModule {
                scope: request.scope.clone(),
                module: request.module.clone(),
                entry_url: request.url.clone(),
                etag: None,
                content_length: None,
                fetched_at: chrono::Utc::now(),
            }),
            MockOutcome::NotFound => Err(ResolutionError::NotFound {
                url: request.url.clone(),
                message: "HTTP 404".into(),
            }),
            MockOutcome::Transient(message) => Err(ResolutionError::Transient {
                url: request.url.clone(),
                message,
            }),
            MockOutcome::Hang => std::future::pending().await,
        }
    }
}

/// A [`CatalogSource`] serving a fixed payload, or failing while offline.
#[derive(Debug, Default)]
pub struct StaticCatalogSource {
    payload: Mutex<Option<Value>>,
    fetches: AtomicUsize,
}

impl StaticCatalogSource {
    /// Serve `payload`.
    #[must_use]
    pub fn new(payload: Value) -> Self {
        Self {
            payload: Mutex::new(Some(payload)),
            fetches: AtomicUsize::new(0),
        }
    }

    /// A source that is unreachable.
    #[must_use]
    pub fn offline() -> Self {
        Self::default()
    }

    /// Serve `payload` from now on.
    pub fn set_payload(&self, payload: Value) {
        *self.payload.lock().unwrap_or_else(PoisonError::into_inner) = Some(payload);
    }

    /// Fail every fetch from now on.
    pub fn go_offline(&self) {
        *self.payload.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Number of fetches so far.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogSource for StaticCatalogSource {
    async fn fetch(&self, _ctx: &ClientContext) -> CatalogResult<Value> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.payload
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| CatalogError::Transport {
                url: "static".into(),
                message: "connection refused".into(),
            })
    }

    fn describe(&self) -> String {
        "static".into()
    }
}
