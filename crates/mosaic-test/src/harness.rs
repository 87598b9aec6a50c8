//! Test harness helpers.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tempfile::{NamedTempFile, TempDir};
use tracing_subscriber::EnvFilter;

use mosaic_manifest::{CatalogLoader, ManifestCache, MemoryStore};
use mosaic_runtime::{EngineConfig, Shell};
use mosaic_telemetry::MemoryTelemetrySink;

use crate::fixtures::test_context;
use crate::mocks::{MockRemoteLoader, StaticCatalogSource};

/// User id the harness signs in with.
pub const TEST_USER: &str = "user-1";

/// Log filter installed by [`ShellHarness`].
pub const TEST_LOG_FILTER: &str = "warn,mosaic_runtime=debug,mosaic_manifest=debug";

/// Create a temporary directory for testing.
///
/// # Panics
///
/// Panics if the temporary directory cannot be created.
#[must_use]
pub fn test_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// Create a temporary file with the given content.
///
/// # Panics
///
/// Panics if the file cannot be created or written.
#[must_use]
pub fn test_file(content: &str) -> NamedTempFile {
    use std::io::Write;

    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");
    file.flush().expect("Failed to flush temp file");
    file
}

/// Write `name` inside `dir` and return its path.
///
/// # Panics
///
/// Panics if the file cannot be written.
#[must_use]
pub fn test_file_in_dir(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write file");
    path
}

/// Route test output through the test writer at `filter`.
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn init_test_logging(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_test_writer()
        .try_init();
}

/// A shell wired to scripted collaborators.
///
/// The remote loader, catalog source, telemetry buffer and cache store stay
/// reachable so tests can script failures and inspect side effects.
#[derive(Debug)]
pub struct ShellHarness {
    /// The shell under test.
    pub shell: Shell,
    /// Scripted remote loader shared with the shell.
    pub loader: MockRemoteLoader,
    /// Catalog source shared with the shell.
    pub source: Arc<StaticCatalogSource>,
    /// Telemetry recorded by the shell.
    pub telemetry: Arc<MemoryTelemetrySink>,
    /// Store backing the manifest cache.
    pub store: Arc<MemoryStore>,
}

impl ShellHarness {
    /// A shell serving `payload` with default engine settings.
    #[must_use]
    pub fn new(payload: Value) -> Self {
        Self::build(
            StaticCatalogSource::new(payload),
            MockRemoteLoader::new(),
            Arc::new(MemoryStore::new()),
            EngineConfig::default(),
            TEST_USER,
        )
    }

    /// A shell whose registry is unreachable.
    #[must_use]
    pub fn offline() -> Self {
        Self::build(
            StaticCatalogSource::offline(),
            MockRemoteLoader::new(),
            Arc::new(MemoryStore::new()),
            EngineConfig::default(),
            TEST_USER,
        )
    }

    /// Assemble a shell from explicit parts.
    ///
    /// # Panics
    ///
    /// Panics if the shell cannot be built.
    #[must_use]
    pub fn build(
        source: StaticCatalogSource,
        loader: MockRemoteLoader,
        store: Arc<MemoryStore>,
        engine: EngineConfig,
        user_id: &str,
    ) -> Self {
        init_test_logging(TEST_LOG_FILTER);

        let source = Arc::new(source);
        let telemetry = Arc::new(MemoryTelemetrySink::new());

        let catalog_loader = CatalogLoader::new(
            Arc::clone(&source) as Arc<dyn mosaic_manifest::CatalogSource>,
            ManifestCache::new(Arc::clone(&store) as Arc<dyn mosaic_manifest::CatalogStore>),
        );
        let shell = Shell::builder(catalog_loader)
            .context(test_context(user_id))
            .remote_loader(Arc::new(loader.clone()))
            .telemetry(Arc::clone(&telemetry) as Arc<dyn mosaic_telemetry::TelemetrySink>)
            .engine_config(engine)
            .build()
            .expect("Failed to build shell");

        Self {
            shell,
            loader,
            source,
            telemetry,
            store,
        }
    }
}
