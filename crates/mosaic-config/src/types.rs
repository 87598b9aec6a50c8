//! Configuration struct definitions.
//!
//! Every section derives `Default` with the same values as the embedded
//! `defaults.toml`, so a partially written file deserializes cleanly.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level shell configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Retry, backoff and timeout tunables for remote resolution.
    pub resolution: ResolutionSection,
    /// Where the catalog comes from and how it is cached.
    pub manifest: ManifestSection,
    /// Remote-load telemetry delivery.
    pub telemetry: TelemetrySection,
    /// Log output.
    pub logging: LoggingSection,
}

/// `[resolution]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionSection {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry, doubled on each retry.
    pub base_delay_ms: u64,
    /// Upper bound for any single retry delay.
    pub max_delay_ms: u64,
    /// Time budget for one attempt.
    pub attempt_timeout_ms: u64,
}

impl Default for ResolutionSection {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 4_000,
            attempt_timeout_ms: 15_000,
        }
    }
}

impl ResolutionSection {
    /// Base retry delay.
    #[must_use]
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Retry delay cap.
    #[must_use]
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Per-attempt timeout.
    #[must_use]
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

/// `[manifest]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestSection {
    /// Registry endpoint serving the catalog.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_url: Option<String>,
    /// Local catalog file, used instead of the registry when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_file: Option<PathBuf>,
    /// Registry request timeout.
    pub fetch_timeout_ms: u64,
    /// How long a cached catalog stays usable.
    pub cache_ttl_secs: u64,
    /// Storage key of the cached catalog envelope.
    pub cache_key: String,
    /// Directory for the persistent cache. Defaults to the platform cache dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl Default for ManifestSection {
    fn default() -> Self {
        Self {
            registry_url: Some("http://localhost:8081/api/registry".to_owned()),
            catalog_file: None,
            fetch_timeout_ms: 12_000,
            cache_ttl_secs: 600,
            cache_key: "mfe-shell.manifest.v1".to_owned(),
            cache_dir: None,
        }
    }
}

impl ManifestSection {
    /// Registry request timeout.
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Cache time-to-live.
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Cache directory, falling back to the platform cache location.
    ///
    /// Returns `None` when neither is available; the cache then runs without
    /// persistent storage.
    #[must_use]
    pub fn resolved_cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir.clone().or_else(|| {
            directories::ProjectDirs::from("dev", "mosaic", "mosaic")
                .map(|dirs| dirs.cache_dir().to_path_buf())
        })
    }
}

/// `[telemetry]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySection {
    /// Post events to `endpoint`.
    pub enabled: bool,
    /// Collector URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Records kept by the in-memory sink.
    pub buffer_size: usize,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: Some("http://localhost:8081/api/telemetry".to_owned()),
            buffer_size: 500,
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Level filter (`info`, `debug`, ...).
    pub level: String,
    /// Output format: `pretty`, `compact`, `json` or `full`.
    pub format: String,
    /// Per-target directive overrides.
    pub directives: Vec<String>,
    /// Write rolling log files here instead of stderr.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
            directory: None,
        }
    }
}
