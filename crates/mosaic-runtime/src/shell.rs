//! One user session of the composing shell.

use std::sync::{Arc, PoisonError, RwLock};

use futures::future::join_all;
use tracing::{Instrument, info, warn};

use mosaic_config::Config;
use mosaic_core::{Catalog, RemoteStatus, RouteDescriptor};
use mosaic_events::{EventBus, EventMetadata, EventReceiver, MosaicEvent, SubscriberId};
use mosaic_manifest::{CatalogLoader, LoadedCatalog, now_ms};
use mosaic_telemetry::{ClientContext, MemoryTelemetrySink, TelemetrySink};

use crate::config_bridge;
use crate::engine::{EngineConfig, ResolutionEngine, ResolvedRemote};
use crate::error::{RuntimeError, RuntimeResult};
use crate::loader::{HttpRemoteLoader, RemoteLoader};
use crate::status::StatusRegistry;

const EVENT_SOURCE: &str = "shell";

/// Builder for [`Shell`].
pub struct ShellBuilder {
    catalog_loader: CatalogLoader,
    ctx: ClientContext,
    remote_loader: Option<Arc<dyn RemoteLoader>>,
    telemetry: Option<Arc<dyn TelemetrySink>>,
    engine: EngineConfig,
    bus: Option<EventBus>,
}

impl ShellBuilder {
    /// Session identity. Defaults to an anonymous session.
    #[must_use]
    pub fn context(mut self, ctx: ClientContext) -> Self {
        self.ctx = ctx;
        self
    }

    /// Remote loader. Defaults to [`HttpRemoteLoader`].
    #[must_use]
    pub fn remote_loader(mut self, loader: Arc<dyn RemoteLoader>) -> Self {
        self.remote_loader = Some(loader);
        self
    }

    /// Telemetry sink. Defaults to a [`MemoryTelemetrySink`].
    #[must_use]
    pub fn telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    /// Engine tunables.
    #[must_use]
    pub fn engine_config(mut self, config: EngineConfig) -> Self {
        self.engine = config;
        self
    }

    /// Event bus. Defaults to a fresh bus owned by the shell.
    #[must_use]
    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Assemble the shell and publish [`MosaicEvent::ShellStarted`].
    ///
    /// # Errors
    ///
    /// Returns an error if the default remote loader cannot be built.
    pub fn build(self) -> RuntimeResult<Shell> {
        let remote_loader: Arc<dyn RemoteLoader> = match self.remote_loader {
            Some(loader) => loader,
            None => Arc::new(HttpRemoteLoader::new()?),
        };
        let telemetry = self
            .telemetry
            .unwrap_or_else(|| Arc::new(MemoryTelemetrySink::new()));
        let bus = self.bus.unwrap_or_default();
        let status = Arc::new(StatusRegistry::new(bus.clone()));
        let engine = ResolutionEngine::new(
            remote_loader,
            Arc::clone(&status),
            telemetry,
            bus.clone(),
            self.engine,
        );

        let shell = Shell {
            ctx: self.ctx,
            bus,
            status,
            engine,
            catalog_loader: self.catalog_loader,
            catalog: RwLock::new(None),
        };
        shell.bus.publish(MosaicEvent::ShellStarted {
            metadata: shell.metadata(),
        });
        info!(
            session_id = %shell.ctx.session_id,
            user_id = %shell.ctx.user_id,
            "Shell started"
        );
        Ok(shell)
    }
}

/// A user session composing remotes from a catalog.
///
/// Owns the event bus, the status registry and the resolution engine. The
/// presentation layer reads status and subscribes to events through the
/// shell; it never mutates status directly.
pub struct Shell {
    ctx: ClientContext,
    bus: EventBus,
    status: Arc<StatusRegistry>,
    engine: ResolutionEngine,
    catalog_loader: CatalogLoader,
    catalog: RwLock<Option<LoadedCatalog>>,
}

impl Shell {
    /// Start building a shell around `catalog_loader`.
    #[must_use]
    pub fn builder(catalog_loader: CatalogLoader) -> ShellBuilder {
        ShellBuilder {
            catalog_loader,
            ctx: ClientContext::anonymous(),
            remote_loader: None,
            telemetry: None,
            engine: EngineConfig::default(),
            bus: None,
        }
    }

    /// Assemble a shell from configuration for `ctx`.
    ///
    /// # Errors
    ///
    /// Returns an error if a collaborator cannot be built from `cfg`.
    pub fn from_config(cfg: &Config, ctx: ClientContext) -> RuntimeResult<Self> {
        Self::builder(config_bridge::to_catalog_loader(cfg)?)
            .context(ctx)
            .telemetry(config_bridge::to_telemetry_sink(cfg)?)
            .engine_config(config_bridge::to_engine_config(cfg))
            .build()
    }

    /// Session identity.
    #[must_use]
    pub fn context(&self) -> &ClientContext {
        &self.ctx
    }

    /// Session event bus.
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    /// The resolution engine.
    #[must_use]
    pub fn engine(&self) -> &ResolutionEngine {
        &self.engine
    }

    /// The catalog loader.
    #[must_use]
    pub fn catalog_loader(&self) -> &CatalogLoader {
        &self.catalog_loader
    }

    /// Load a catalog and apply it.
    ///
    /// Status entries are seeded for new scopes; existing entries survive.
    ///
    /// # Errors
    ///
    /// Returns an error if neither the source nor the cache yields a catalog.
    /// The previously applied catalog, if any, stays in place.
    pub async fn load_catalog(&self) -> RuntimeResult<LoadedCatalog> {
        let loaded = match self
            .catalog_loader
            .load(&self.ctx, now_ms())
            .instrument(self.ctx.span())
            .await
        {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(error = %e, "No catalog available");
                self.bus.publish(MosaicEvent::CatalogUnavailable {
                    metadata: self.metadata(),
                    reason: e.to_string(),
                });
                return Err(e.into());
            },
        };

        self.status.initialize(loaded.catalog.routes());
        self.bus.publish(MosaicEvent::CatalogLoaded {
            metadata: self.metadata(),
            platform: loaded.catalog.platform().to_owned(),
            route_count: loaded.catalog.routes().len(),
            origin: loaded.origin,
        });
        if let Some(notice) = &loaded.notice {
            warn!(notice = %notice, "Catalog degraded");
        }

        *self.catalog.write().unwrap_or_else(PoisonError::into_inner) = Some(loaded.clone());
        Ok(loaded)
    }

    /// The applied catalog.
    #[must_use]
    pub fn catalog(&self) -> Option<Arc<Catalog>> {
        self.read_catalog()
            .as_ref()
            .map(|loaded| Arc::clone(&loaded.catalog))
    }

    /// Degradation notice of the applied catalog.
    #[must_use]
    pub fn notice(&self) -> Option<String> {
        self.read_catalog()
            .as_ref()
            .and_then(|loaded| loaded.notice.clone())
    }

    /// Routes of the applied catalog, in catalog order.
    #[must_use]
    pub fn routes(&self) -> Vec<RouteDescriptor> {
        self.catalog()
            .map(|catalog| catalog.routes().to_vec())
            .unwrap_or_default()
    }

    /// Resolve the remote behind `route_id`.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown route or a terminal resolution failure.
    pub async fn resolve(&self, route_id: &str) -> RuntimeResult<ResolvedRemote> {
        let route = self.route(route_id)?;
        Ok(self
            .engine
            .resolve(&route, &self.ctx)
            .instrument(self.ctx.span())
            .await?)
    }

    /// Resolve every route concurrently. One route failing does not affect
    /// the others.
    pub async fn resolve_all(&self) -> Vec<(String, RuntimeResult<ResolvedRemote>)> {
        let routes = self.routes();
        let resolutions = routes.iter().map(|route| async move {
            let result = self
                .engine
                .resolve(route, &self.ctx)
                .await
                .map_err(RuntimeError::from);
            (route.id.clone(), result)
        });
        join_all(resolutions).instrument(self.ctx.span()).await
    }

    /// User-triggered retry of `route_id`.
    ///
    /// # Errors
    ///
    /// Same as [`resolve`](Self::resolve).
    pub async fn retry(&self, route_id: &str) -> RuntimeResult<ResolvedRemote> {
        let route = self.route(route_id)?;
        Ok(self
            .engine
            .retry(&route, &self.ctx)
            .instrument(self.ctx.span())
            .await?)
    }

    /// Status of `scope`.
    #[must_use]
    pub fn status(&self, scope: &str) -> Option<RemoteStatus> {
        self.status.get(scope)
    }

    /// Status of every scope.
    #[must_use]
    pub fn statuses(&self) -> Vec<RemoteStatus> {
        self.status.list()
    }

    /// Whether any remote is degraded or failed.
    #[must_use]
    pub fn has_degraded_remote(&self) -> bool {
        self.status.has_degraded_remote()
    }

    /// Receive session events. Dropping the receiver unsubscribes.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        self.bus.subscribe()
    }

    /// Register a synchronous handler. The id is the unsubscribe handle.
    pub fn subscribe_fn<F>(&self, name: impl Into<String>, handler: F) -> SubscriberId
    where
        F: Fn(&MosaicEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe_fn(name, handler)
    }

    /// Remove a handler registered with [`subscribe_fn`](Self::subscribe_fn).
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// End the session: publish [`MosaicEvent::ShellStopped`] and drop every
    /// registered handler.
    pub fn shutdown(&self) {
        self.bus.publish(MosaicEvent::ShellStopped {
            metadata: self.metadata(),
        });
        self.bus.registry().clear();
        info!(session_id = %self.ctx.session_id, "Shell stopped");
    }

    fn route(&self, route_id: &str) -> RuntimeResult<RouteDescriptor> {
        let catalog = self.catalog().ok_or(RuntimeError::CatalogNotLoaded)?;
        catalog
            .route(route_id)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownRoute(route_id.to_owned()))
    }

    fn read_catalog(&self) -> std::sync::RwLockReadGuard<'_, Option<LoadedCatalog>> {
        self.catalog.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn metadata(&self) -> EventMetadata {
        EventMetadata::new(EVENT_SOURCE)
            .with_session_id(&self.ctx.session_id)
            .with_user_id(&self.ctx.user_id)
    }
}

impl std::fmt::Debug for Shell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shell")
            .field("ctx", &self.ctx)
            .field("engine", &self.engine)
            .field("routes", &self.routes().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{LoadRequest, RemoteModule};
    use async_trait::async_trait;
    use mosaic_core::{LoadState, ResolutionResult};
    use mosaic_manifest::{CatalogError, CatalogResult, CatalogSource, ManifestCache};
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticSource(Option<Value>);

    #[async_trait]
    impl CatalogSource for StaticSource {
        async fn fetch(&self, _ctx: &ClientContext) -> CatalogResult<Value> {
            self.0.clone().ok_or_else(|| CatalogError::Unavailable {
                reason: "offline".into(),
            })
        }

        fn describe(&self) -> String {
            "static".into()
        }
    }

    struct AlwaysLoads;

    #[async_trait]
    impl RemoteLoader for AlwaysLoads {
        async fn load(&self, request: &LoadRequest) -> ResolutionResult<RemoteModule> {
            Ok(RemoteModule {
                scope: request.scope.clone(),
                module: request.module.clone(),
                entry_url: request.url.clone(),
                etag: None,
                content_length: None,
                fetched_at: chrono::Utc::now(),
            })
        }
    }

    fn catalog_json() -> Value {
        json!({
            "platform": "mfe-platform",
            "routes": [{
                "id": "accounts",
                "title": "Accounts",
                "path": "/accounts",
                "requiredRoles": ["USER"],
                "remote": {
                    "scope": "remote_accounts",
                    "module": "./routes",
                    "stable": { "url": "http://cdn/accounts/entry.js", "version": "1.0.0" },
                    "canary": { "url": "http://cdn/accounts/canary.js", "version": "1.1.0" },
                    "rollout": { "canaryEnabled": false, "canaryPercentage": 0 }
                }
            }]
        })
    }

    fn shell(payload: Option<Value>) -> Shell {
        Shell::builder(CatalogLoader::new(
            Arc::new(StaticSource(payload)),
            ManifestCache::unavailable(),
        ))
        .context(ClientContext::new("user-1"))
        .remote_loader(Arc::new(AlwaysLoads))
        .build()
        .unwrap()
    }

    #[tokio::test]
    async fn test_load_catalog_seeds_status() {
        let shell = shell(Some(catalog_json()));
        let mut events = shell.subscribe();

        let loaded = shell.load_catalog().await.unwrap();
        assert!(!loaded.is_degraded());
        assert_eq!(shell.routes().len(), 1);
        assert_eq!(
            shell.status("remote_accounts").unwrap().state,
            LoadState::Idle
        );

        assert_eq!(events.recv().await.unwrap().event_type(), "status_seeded");
        assert_eq!(events.recv().await.unwrap().event_type(), "catalog_loaded");
    }

    #[tokio::test]
    async fn test_resolve_requires_catalog() {
        let shell = shell(Some(catalog_json()));
        assert!(matches!(
            shell.resolve("accounts").await,
            Err(RuntimeError::CatalogNotLoaded)
        ));

        shell.load_catalog().await.unwrap();
        assert!(matches!(
            shell.resolve("ghost").await,
            Err(RuntimeError::UnknownRoute(id)) if id == "ghost"
        ));
        assert!(shell.resolve("accounts").await.is_ok());
        assert!(!shell.has_degraded_remote());
    }

    #[tokio::test]
    async fn test_catalog_unavailable() {
        let shell = shell(None);
        let mut events = shell.subscribe();

        assert!(matches!(
            shell.load_catalog().await,
            Err(RuntimeError::Catalog(CatalogError::Unavailable { .. }))
        ));
        assert!(shell.catalog().is_none());
        assert_eq!(
            events.recv().await.unwrap().event_type(),
            "catalog_unavailable"
        );
    }

    #[tokio::test]
    async fn test_shutdown_clears_handlers() {
        let shell = shell(Some(catalog_json()));
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        shell.subscribe_fn("counter", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        shell.load_catalog().await.unwrap();
        let before = seen.load(Ordering::SeqCst);
        assert!(before >= 2);

        shell.shutdown();
        assert_eq!(seen.load(Ordering::SeqCst), before.saturating_add(1));
        assert!(shell.event_bus().registry().is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribe_handle() {
        let shell = shell(Some(catalog_json()));
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let id = shell.subscribe_fn("counter", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(shell.unsubscribe(id));
        shell.load_catalog().await.unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }
}
