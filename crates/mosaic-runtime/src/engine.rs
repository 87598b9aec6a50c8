//! The remote resolution state machine.
//!
//! For one route and user the engine picks a variant, then loops over
//! attempts `0..=max_retries`:
//!
//! - each attempt publishes `loading`, then awaits a deduplicated,
//!   time-bounded fetch of the preferred build;
//! - success publishes `loaded` and ends the loop;
//! - a canary failure falls back to the stable build exactly once and ends
//!   the loop either way;
//! - a non-retryable failure ends the loop at once;
//! - any other failure sleeps the scheduled delay and tries again.
//!
//! A user-triggered [`retry`](ResolutionEngine::retry) takes over the route.
//! Any older loop for that route stops at its next status update and returns
//! [`ResolutionError::Superseded`].

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::FutureExt;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use mosaic_core::rollout::{self, Targets};
use mosaic_core::{
    BackoffPolicy, RemoteTarget, ResolutionError, ResolutionResult, RouteDescriptor,
    StatusPatch, Variant,
};
use mosaic_events::{EventBus, EventMetadata, MosaicEvent, ResolutionErrorInfo};
use mosaic_telemetry::{ClientContext, TelemetryEvent, TelemetryEventType, TelemetrySink};

use crate::cache::ResolutionCache;
use crate::loader::{LoadRequest, RemoteLoader, RemoteModule, load_with_entry_fallback};
use crate::status::StatusRegistry;

const EVENT_SOURCE: &str = "resolution_engine";

/// Default time budget for one attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(15);

/// Engine tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Retry schedule.
    pub backoff: BackoffPolicy,
    /// Time budget for one attempt, including the entry-path fallback.
    pub attempt_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffPolicy::default(),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

/// A successfully resolved route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRemote {
    /// Route that was resolved.
    pub route_id: String,
    /// The loadable reference.
    pub module: Arc<RemoteModule>,
    /// Variant actually served.
    pub variant: Variant,
    /// Version actually served.
    pub version: String,
    /// Whether the canary failed and stable was served instead.
    pub degraded: bool,
    /// Attempts made, including the successful one.
    pub attempts: u32,
}

/// Resolves routes to loadable remote references.
pub struct ResolutionEngine {
    loader: Arc<dyn RemoteLoader>,
    cache: ResolutionCache,
    status: Arc<StatusRegistry>,
    telemetry: Arc<dyn TelemetrySink>,
    bus: EventBus,
    config: EngineConfig,
    generations: DashMap<String, u64>,
}

/// One run of the attempt loop.
struct Run<'a> {
    route: &'a RouteDescriptor,
    ctx: &'a ClientContext,
    targets: Targets<'a>,
    generation: u64,
    started: Instant,
}

impl Run<'_> {
    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn telemetry(&self, event_type: TelemetryEventType) -> TelemetryEvent {
        TelemetryEvent::new(
            event_type,
            &self.route.remote.scope,
            &self.route.id,
            self.elapsed_ms(),
        )
    }
}

impl ResolutionEngine {
    /// Create an engine.
    #[must_use]
    pub fn new(
        loader: Arc<dyn RemoteLoader>,
        status: Arc<StatusRegistry>,
        telemetry: Arc<dyn TelemetrySink>,
        bus: EventBus,
        config: EngineConfig,
    ) -> Self {
        Self {
            loader,
            cache: ResolutionCache::new(),
            status,
            telemetry,
            bus,
            config,
            generations: DashMap::new(),
        }
    }

    /// Engine tunables.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The deduplication cache.
    #[must_use]
    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Resolve `route` for the user in `ctx`.
    ///
    /// Joins the route's current resolution session; concurrent calls share
    /// fetches and publish identical status.
    ///
    /// # Errors
    ///
    /// Returns the terminal [`ResolutionError`] once retries and fallback are
    /// exhausted, or [`ResolutionError::Superseded`] if a retry took over.
    pub async fn resolve(
        &self,
        route: &RouteDescriptor,
        ctx: &ClientContext,
    ) -> ResolutionResult<ResolvedRemote> {
        let generation = *self.generations.entry(route.id.clone()).or_insert(0);
        self.run(route, ctx, generation).await
    }

    /// Start a fresh resolution of `route`, superseding any loop in flight.
    ///
    /// The attempt counter and error start over. Cached resolutions for
    /// other URLs are kept.
    ///
    /// # Errors
    ///
    /// Same as [`resolve`](Self::resolve).
    pub async fn retry(
        &self,
        route: &RouteDescriptor,
        ctx: &ClientContext,
    ) -> ResolutionResult<ResolvedRemote> {
        let generation = {
            let mut current = self.generations.entry(route.id.clone()).or_insert(0);
            *current = current.wrapping_add(1);
            *current
        };
        info!(
            route_id = %route.id,
            scope = %route.remote.scope,
            generation,
            "Retry requested"
        );
        self.run(route, ctx, generation).await
    }

    async fn run(
        &self,
        route: &RouteDescriptor,
        ctx: &ClientContext,
        generation: u64,
    ) -> ResolutionResult<ResolvedRemote> {
        let run = Run {
            route,
            ctx,
            targets: rollout::targets(route, &ctx.user_id),
            generation,
            started: Instant::now(),
        };
        let preferred = run.targets.preferred;

        info!(
            event = "remote.load.attempt",
            route_id = %route.id,
            scope = %route.remote.scope,
            user_id = %ctx.user_id,
            variant = %run.targets.variant,
            url = %preferred.url,
            "Resolving remote"
        );

        let schedule = self.config.backoff.schedule();
        let mut attempt: u32 = 0;
        loop {
            self.publish(&run, StatusPatch::loading(attempt))?;

            let error = match self.fetch(route, preferred).await {
                Ok(module) => return self.succeed(&run, module, attempt),
                Err(error) => error,
            };

            if run.targets.variant == Variant::Canary {
                return self.fall_back(&run, &error, attempt).await;
            }

            if !error.is_retryable() {
                error!(
                    event = "remote.load.non_retryable_failure",
                    route_id = %route.id,
                    scope = %route.remote.scope,
                    error = %error,
                    attempt = attempt.saturating_add(1),
                    "Remote entry missing, not retrying"
                );
                return self.fail(&run, error, attempt, run.targets.variant.as_str());
            }

            let delay = usize::try_from(attempt)
                .ok()
                .and_then(|index| schedule.get(index).copied());
            let Some(delay) = delay else {
                return self.fail(&run, error, attempt, run.targets.variant.as_str());
            };

            warn!(
                event = "remote.load.retry_scheduled",
                route_id = %route.id,
                scope = %route.remote.scope,
                attempt = attempt.saturating_add(1),
                backoff_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "Retrying remote"
            );
            tokio::time::sleep(delay).await;
            attempt = attempt.saturating_add(1);
        }
    }

    /// One deduplicated, time-bounded fetch of `target`.
    async fn fetch(
        &self,
        route: &RouteDescriptor,
        target: &RemoteTarget,
    ) -> ResolutionResult<Arc<RemoteModule>> {
        let request = LoadRequest::new(&route.remote.scope, &route.remote.module, &target.url);
        let loader = Arc::clone(&self.loader);
        let timeout = self.config.attempt_timeout;
        let route_id = route.id.clone();
        let owned = request.clone();

        self.cache
            .resolve(&request, move || {
                async move {
                    let load = load_with_entry_fallback(loader.as_ref(), &route_id, &owned);
                    match tokio::time::timeout(timeout, load).await {
                        Ok(result) => result.map(Arc::new),
                        Err(_) => Err(ResolutionError::Timeout {
                            scope: owned.scope.clone(),
                            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                        }),
                    }
                }
                .boxed()
            })
            .await
    }

    fn succeed(
        &self,
        run: &Run<'_>,
        module: Arc<RemoteModule>,
        attempt: u32,
    ) -> ResolutionResult<ResolvedRemote> {
        let Run { route, targets, .. } = run;
        let variant = targets.variant;
        let version = targets.preferred.version.clone();

        self.publish(
            run,
            StatusPatch::loaded(version.clone(), variant, attempt, module.fetched_at),
        )?;

        let attempts = attempt.saturating_add(1);
        info!(
            event = "remote.load.success",
            route_id = %route.id,
            scope = %route.remote.scope,
            variant = %variant,
            version = %version,
            duration_ms = run.elapsed_ms(),
            attempts,
            "Remote resolved"
        );
        self.telemetry.emit(
            run.ctx,
            run.telemetry(TelemetryEventType::RemoteLoadSuccess)
                .with_metadata("variant", variant.as_str())
                .with_metadata("version", version.clone())
                .with_metadata("attempts", attempts),
        );

        Ok(self.resolved(run, module, variant, version, false, attempts))
    }

    async fn fall_back(
        &self,
        run: &Run<'_>,
        canary_error: &ResolutionError,
        attempt: u32,
    ) -> ResolutionResult<ResolvedRemote> {
        let Run { route, ctx, targets, .. } = run;
        let canary_message = canary_error.to_string();

        warn!(
            event = "remote.load.canary_failed_fallback",
            route_id = %route.id,
            user_id = %ctx.user_id,
            canary_url = %targets.preferred.url,
            stable_url = %targets.fallback.url,
            error = %canary_message,
            duration_ms = run.elapsed_ms(),
            "Canary failed, falling back to stable"
        );
        self.telemetry.emit(
            ctx,
            run.telemetry(TelemetryEventType::RemoteLoadCanaryFailed)
                .with_message(canary_message.clone())
                .with_metadata("canaryVersion", targets.preferred.version.clone())
                .with_metadata("stableVersion", targets.fallback.version.clone()),
        );

        match self.fetch(route, targets.fallback).await {
            Ok(module) => {
                let version = targets.fallback.version.clone();
                self.publish(
                    run,
                    StatusPatch::loaded(version.clone(), Variant::Stable, attempt, module.fetched_at)
                        .with_degraded(format!("Canary failed, fallback to stable: {canary_message}")),
                )?;

                let attempts = attempt.saturating_add(1);
                info!(
                    event = "remote.load.stable_fallback_success",
                    route_id = %route.id,
                    scope = %route.remote.scope,
                    version = %version,
                    "Serving stable fallback"
                );
                self.telemetry.emit(
                    ctx,
                    run.telemetry(TelemetryEventType::RemoteLoadSuccess)
                        .with_metadata("variant", Variant::Stable.as_str())
                        .with_metadata("version", version.clone())
                        .with_metadata("attempts", attempts)
                        .with_metadata("degraded", true),
                );

                Ok(self.resolved(run, module, Variant::Stable, version, true, attempts))
            },
            Err(fallback_error) => {
                error!(
                    event = "remote.load.stable_fallback_failed",
                    route_id = %route.id,
                    scope = %route.remote.scope,
                    error = %fallback_error,
                    "Stable fallback failed"
                );
                self.publish(run, StatusPatch::failed(fallback_error.to_string(), attempt))?;

                let exhausted = ResolutionError::CanaryFallbackExhausted {
                    canary_error: canary_message,
                    fallback_error: fallback_error.to_string(),
                };
                self.report_failure(
                    run,
                    &exhausted,
                    &fallback_error.to_string(),
                    "stable-fallback",
                    attempt,
                );
                Err(exhausted)
            },
        }
    }

    fn fail(
        &self,
        run: &Run<'_>,
        error: ResolutionError,
        attempt: u32,
        attempted_variant: &str,
    ) -> ResolutionResult<ResolvedRemote> {
        let message = error.to_string();
        self.publish(run, StatusPatch::failed(message.clone(), attempt))?;

        error!(
            event = "remote.load.failure",
            route_id = %run.route.id,
            scope = %run.route.remote.scope,
            error = %message,
            duration_ms = run.elapsed_ms(),
            attempts = attempt.saturating_add(1),
            "Remote failed to load"
        );
        self.report_failure(run, &error, &message, attempted_variant, attempt);
        Err(error)
    }

    fn report_failure(
        &self,
        run: &Run<'_>,
        error: &ResolutionError,
        message: &str,
        attempted_variant: &str,
        attempt: u32,
    ) {
        self.telemetry.emit(
            run.ctx,
            run.telemetry(TelemetryEventType::RemoteLoadFailure)
                .with_message(message)
                .with_metadata("attemptedVariant", attempted_variant)
                .with_metadata("attempts", attempt.saturating_add(1)),
        );
        self.bus.publish(MosaicEvent::RemoteFailed {
            metadata: Self::metadata(run.ctx),
            route_id: run.route.id.clone(),
            scope: run.route.remote.scope.clone(),
            error: ResolutionErrorInfo::from(error),
        });
    }

    fn resolved(
        &self,
        run: &Run<'_>,
        module: Arc<RemoteModule>,
        variant: Variant,
        version: String,
        degraded: bool,
        attempts: u32,
    ) -> ResolvedRemote {
        self.bus.publish(MosaicEvent::RemoteResolved {
            metadata: Self::metadata(run.ctx),
            route_id: run.route.id.clone(),
            scope: run.route.remote.scope.clone(),
            variant,
            degraded,
        });
        ResolvedRemote {
            route_id: run.route.id.clone(),
            module,
            variant,
            version,
            degraded,
            attempts,
        }
    }

    /// Apply `patch` if this run still owns the route.
    fn publish(&self, run: &Run<'_>, patch: StatusPatch) -> ResolutionResult<()> {
        let current = self
            .generations
            .get(&run.route.id)
            .map_or(0, |generation| *generation);
        if current != run.generation {
            debug!(
                route_id = %run.route.id,
                generation = run.generation,
                current,
                "Resolution superseded, dropping update"
            );
            return Err(ResolutionError::Superseded {
                route_id: run.route.id.clone(),
            });
        }
        self.status.update(&run.route.remote.scope, patch);
        Ok(())
    }

    fn metadata(ctx: &ClientContext) -> EventMetadata {
        EventMetadata::new(EVENT_SOURCE)
            .with_session_id(&ctx.session_id)
            .with_user_id(&ctx.user_id)
    }
}

impl std::fmt::Debug for ResolutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionEngine")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mosaic_core::{LoadState, RemoteConfig, RolloutConfig};
    use mosaic_telemetry::MemoryTelemetrySink;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    const STABLE_URL: &str = "http://cdn/accounts/stable/entry.js";
    const CANARY_URL: &str = "http://cdn/accounts/canary/entry.js";

    #[derive(Clone, Copy)]
    enum Outcome {
        Ok,
        NotFound,
        Transient,
        Hang,
    }

    #[derive(Default)]
    struct ScriptedLoader {
        scripts: Mutex<HashMap<String, VecDeque<Outcome>>>,
        calls: Mutex<HashMap<String, usize>>,
        latency: Duration,
    }

    impl ScriptedLoader {
        fn script(self, url: &str, outcomes: &[Outcome]) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .insert(url.to_owned(), outcomes.iter().copied().collect());
            self
        }

        fn calls(&self, url: &str) -> usize {
            self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl RemoteLoader for ScriptedLoader {
        async fn load(&self, request: &LoadRequest) -> ResolutionResult<RemoteModule> {
            {
                let mut calls = self.calls.lock().unwrap();
                let count = calls.entry(request.url.clone()).or_default();
                *count = count.saturating_add(1);
            }
            let outcome = self
                .scripts
                .lock()
                .unwrap()
                .get_mut(&request.url)
                .and_then(VecDeque::pop_front)
                .unwrap_or(Outcome::Ok);

            tokio::time::sleep(self.latency).await;
            match outcome {
                Outcome::Ok => Ok(RemoteModule {
                    scope: request.scope.clone(),
                    module: request.module.clone(),
                    entry_url: request.url.clone(),
                    etag: None,
                    content_length: None,
                    fetched_at: chrono::Utc::now(),
                }),
                Outcome::NotFound => Err(ResolutionError::NotFound {
                    url: request.url.clone(),
                    message: "HTTP 404".into(),
                }),
                Outcome::Transient => Err(ResolutionError::Transient {
                    url: request.url.clone(),
                    message: "HTTP 503".into(),
                }),
                Outcome::Hang => std::future::pending().await,
            }
        }
    }

    fn route(canary: bool) -> RouteDescriptor {
        RouteDescriptor {
            id: "accounts".into(),
            title: "Accounts".into(),
            path: "/accounts".into(),
            required_roles: Vec::new(),
            remote: RemoteConfig {
                scope: "remote_accounts".into(),
                module: "./routes".into(),
                stable: RemoteTarget {
                    url: STABLE_URL.into(),
                    version: "1.0.0".into(),
                },
                canary: RemoteTarget {
                    url: CANARY_URL.into(),
                    version: "1.1.0".into(),
                },
                rollout: RolloutConfig {
                    canary_enabled: canary,
                    canary_percentage: 100.0,
                },
            },
        }
    }

    struct Harness {
        engine: ResolutionEngine,
        loader: Arc<ScriptedLoader>,
        status: Arc<StatusRegistry>,
        telemetry: Arc<MemoryTelemetrySink>,
        ctx: ClientContext,
    }

    fn harness(loader: ScriptedLoader, config: EngineConfig) -> Harness {
        let bus = EventBus::new();
        let loader = Arc::new(loader);
        let status = Arc::new(StatusRegistry::new(bus.clone()));
        let telemetry = Arc::new(MemoryTelemetrySink::new());
        status.initialize(&[route(false)]);

        let engine = ResolutionEngine::new(
            Arc::clone(&loader) as Arc<dyn RemoteLoader>,
            Arc::clone(&status),
            Arc::clone(&telemetry) as Arc<dyn TelemetrySink>,
            bus,
            config,
        );
        Harness {
            engine,
            loader,
            status,
            telemetry,
            ctx: ClientContext::new("user-1"),
        }
    }

    fn event_types(sink: &MemoryTelemetrySink) -> Vec<TelemetryEventType> {
        let mut types: Vec<_> = sink.events().into_iter().map(|e| e.event_type).collect();
        types.reverse();
        types
    }

    #[tokio::test(start_paused = true)]
    async fn test_stable_success_first_attempt() {
        let h = harness(ScriptedLoader::default(), EngineConfig::default());

        let resolved = h.engine.resolve(&route(false), &h.ctx).await.unwrap();
        assert_eq!(resolved.variant, Variant::Stable);
        assert_eq!(resolved.attempts, 1);
        assert!(!resolved.degraded);

        let status = h.status.get("remote_accounts").unwrap();
        assert_eq!(status.state, LoadState::Loaded);
        assert_eq!(status.retry_count, 0);
        assert!(status.loaded_at.is_some());
        assert_eq!(event_types(&h.telemetry), vec![TelemetryEventType::RemoteLoadSuccess]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried_with_backoff() {
        let loader = ScriptedLoader::default()
            .script(STABLE_URL, &[Outcome::Transient, Outcome::Transient]);
        let h = harness(loader, EngineConfig::default());
        let started = Instant::now();

        let resolved = h.engine.resolve(&route(false), &h.ctx).await.unwrap();
        assert_eq!(resolved.attempts, 3);
        assert_eq!(h.loader.calls(STABLE_URL), 3);
        assert_eq!(started.elapsed(), Duration::from_millis(1_500));
        assert_eq!(h.status.get("remote_accounts").unwrap().retry_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_make_n_plus_one_attempts() {
        let loader = ScriptedLoader::default().script(STABLE_URL, &[Outcome::Transient; 8]);
        let h = harness(loader, EngineConfig::default());

        let err = h.engine.resolve(&route(false), &h.ctx).await.unwrap_err();
        assert!(matches!(err, ResolutionError::Transient { .. }));
        assert_eq!(h.loader.calls(STABLE_URL), 4);

        let status = h.status.get("remote_accounts").unwrap();
        assert_eq!(status.state, LoadState::Error);
        assert!(status.degraded);
        assert_eq!(status.retry_count, 3);

        let failure = &h.telemetry.events()[0];
        assert_eq!(failure.event_type, TelemetryEventType::RemoteLoadFailure);
        assert_eq!(failure.metadata["attemptedVariant"], "stable");
        assert_eq!(failure.metadata["attempts"], 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_skips_retries() {
        let loader = ScriptedLoader::default().script(STABLE_URL, &[Outcome::NotFound]);
        let h = harness(loader, EngineConfig::default());

        let err = h.engine.resolve(&route(false), &h.ctx).await.unwrap_err();
        assert!(matches!(err, ResolutionError::NotFound { .. }));
        assert_eq!(h.loader.calls(STABLE_URL), 1);

        let status = h.status.get("remote_accounts").unwrap();
        assert_eq!(status.state, LoadState::Error);
        assert_eq!(status.retry_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_canary_failure_falls_back_to_stable() {
        let loader = ScriptedLoader::default().script(CANARY_URL, &[Outcome::Transient]);
        let h = harness(loader, EngineConfig::default());

        let resolved = h.engine.resolve(&route(true), &h.ctx).await.unwrap();
        assert_eq!(resolved.variant, Variant::Stable);
        assert_eq!(resolved.version, "1.0.0");
        assert!(resolved.degraded);
        assert_eq!(h.loader.calls(CANARY_URL), 1);
        assert_eq!(h.loader.calls(STABLE_URL), 1);

        let status = h.status.get("remote_accounts").unwrap();
        assert_eq!(status.state, LoadState::Loaded);
        assert_eq!(status.variant, Variant::Stable);
        assert!(status.degraded);
        let error = status.error.unwrap();
        assert!(error.starts_with("Canary failed, fallback to stable:"));
        assert!(error.contains(CANARY_URL));

        assert_eq!(
            event_types(&h.telemetry),
            vec![
                TelemetryEventType::RemoteLoadCanaryFailed,
                TelemetryEventType::RemoteLoadSuccess
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_canary_and_stable_failure_is_terminal() {
        let loader = ScriptedLoader::default()
            .script(CANARY_URL, &[Outcome::Transient])
            .script(STABLE_URL, &[Outcome::NotFound]);
        let h = harness(loader, EngineConfig::default());

        let err = h.engine.resolve(&route(true), &h.ctx).await.unwrap_err();
        assert!(matches!(err, ResolutionError::CanaryFallbackExhausted { .. }));
        assert_eq!(h.loader.calls(CANARY_URL), 1);

        let status = h.status.get("remote_accounts").unwrap();
        assert_eq!(status.state, LoadState::Error);
        assert!(status.degraded);
        assert!(status.error.unwrap().contains(STABLE_URL));

        let failure = &h.telemetry.events()[0];
        assert_eq!(failure.metadata["attemptedVariant"], "stable-fallback");
        assert_eq!(failure.metadata["attempts"], 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout() {
        let loader = ScriptedLoader::default().script(STABLE_URL, &[Outcome::Hang]);
        let config = EngineConfig {
            backoff: BackoffPolicy::no_retry(),
            attempt_timeout: Duration::from_secs(1),
        };
        let h = harness(loader, config);

        let err = h.engine.resolve(&route(false), &h.ctx).await.unwrap_err();
        assert_eq!(
            err,
            ResolutionError::Timeout {
                scope: "remote_accounts".into(),
                timeout_ms: 1_000,
            }
        );
        assert!(h.engine.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_resolutions_share_one_fetch() {
        let loader = ScriptedLoader {
            latency: Duration::from_millis(100),
            ..ScriptedLoader::default()
        };
        let h = harness(loader, EngineConfig::default());
        let route = route(false);

        let (a, b) = tokio::join!(
            h.engine.resolve(&route, &h.ctx),
            h.engine.resolve(&route, &h.ctx)
        );
        assert_eq!(a.unwrap().module, b.unwrap().module);
        assert_eq!(h.loader.calls(STABLE_URL), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_supersedes_running_loop() {
        let loader = ScriptedLoader::default().script(STABLE_URL, &[Outcome::Transient]);
        let h = harness(loader, EngineConfig::default());
        let route = route(false);

        let (first, second) = tokio::join!(h.engine.resolve(&route, &h.ctx), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            h.engine.retry(&route, &h.ctx).await
        });

        assert_eq!(
            first.unwrap_err(),
            ResolutionError::Superseded {
                route_id: "accounts".into()
            }
        );
        assert_eq!(second.unwrap().attempts, 1);

        let status = h.status.get("remote_accounts").unwrap();
        assert_eq!(status.state, LoadState::Loaded);
        assert_eq!(status.retry_count, 0);
        assert_eq!(h.loader.calls(STABLE_URL), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_failure_starts_clean() {
        let loader = ScriptedLoader::default().script(STABLE_URL, &[Outcome::NotFound]);
        let h = harness(loader, EngineConfig::default());
        let route = route(false);

        assert!(h.engine.resolve(&route, &h.ctx).await.is_err());
        let resolved = h.engine.retry(&route, &h.ctx).await.unwrap();
        assert_eq!(resolved.attempts, 1);

        let status = h.status.get("remote_accounts").unwrap();
        assert_eq!(status.state, LoadState::Loaded);
        assert!(!status.degraded);
        assert!(status.error.is_none());
    }
}
