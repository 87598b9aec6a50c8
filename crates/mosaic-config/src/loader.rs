//! Config file discovery and layered loading.
//!
//! 1. Parse the embedded `defaults.toml`
//! 2. Merge the user config file, if any
//! 3. Apply `MOSAIC_*` fallbacks for fields the file left unset
//! 4. Deserialize and validate

use std::collections::{BTreeSet, HashMap};
use std::hash::BuildHasher;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{deep_merge, leaf_paths};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Platform config file location (`~/.config/mosaic/config.toml` on Linux).
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "mosaic", "mosaic")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration from the process environment.
///
/// With `path`, that file must exist. Without it, the platform config file
/// is used when present.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a file is unreadable or malformed, an
/// environment variable does not parse, or the result fails validation.
pub fn load(path: Option<&Path>) -> ConfigResult<Config> {
    load_with_env(path, &collect_env_vars())
}

/// Load configuration against an explicit environment map.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_env<S: BuildHasher>(
    path: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<Config> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let overlay = match path {
        Some(path) => Some((read_file(path)?, path.to_path_buf())),
        None => match default_config_path() {
            Some(path) => try_load_file(&path)?.map(|overlay| (overlay, path)),
            None => None,
        },
    };

    let mut file_fields = BTreeSet::new();
    if let Some((overlay, path)) = overlay {
        file_fields = leaf_paths(&overlay);
        deep_merge(&mut merged, &overlay);
        info!(path = %path.display(), "loaded config file");
    }

    let env_count = apply_env_fallbacks(&mut merged, &file_fields, env_vars)?;
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;
    Ok(config)
}

/// Parse a TOML string on top of the defaults, without environment fallbacks.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the string is malformed or fails validation.
pub fn from_toml_str(content: &str) -> ConfigResult<Config> {
    let overlay = parse(content, "<string>")?;
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;
    deep_merge(&mut merged, &overlay);

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<string>".to_owned(),
                source: e,
            })?;
    validate::validate(&config)?;
    Ok(config)
}

fn parse(content: &str, path: &str) -> ConfigResult<toml::Value> {
    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.to_owned(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: path.to_owned(),
        source: e,
    })
}

fn read_file(path: &Path) -> ConfigResult<toml::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse(&content, &path.display().to_string())
}

/// Try to load a file, returning `None` if it doesn't exist.
///
/// A single read avoids a race between an existence check and the read.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse(&content, &path.display().to_string()).map(Some),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            Ok(None)
        },
        Err(e) => Err(ConfigError::ReadError {
            path: path.display().to_string(),
            source: e,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_defaults_deserialize_to_default_config() {
        let config: Config = toml::from_str(DEFAULTS_TOML).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let (_dir, path) = write_config(
            r#"
            [resolution]
            max_retries = 5

            [manifest]
            cache_ttl_secs = 60
            "#,
        );

        let config = load_with_env(Some(&path), &env(&[])).unwrap();

        assert_eq!(config.resolution.max_retries, 5);
        assert_eq!(config.resolution.base_delay_ms, 500);
        assert_eq!(config.manifest.cache_ttl_secs, 60);
        assert_eq!(config.manifest.cache_key, "mfe-shell.manifest.v1");
    }

    #[test]
    fn test_env_fills_unset_fields_only() {
        let (_dir, path) = write_config("[logging]\nlevel = \"warn\"");
        let vars = env(&[
            ("MOSAIC_LOG_LEVEL", "trace"),
            ("MOSAIC_REGISTRY_URL", "https://registry.example.com/api/registry"),
        ]);

        let config = load_with_env(Some(&path), &vars).unwrap();

        assert_eq!(config.logging.level, "warn");
        assert_eq!(
            config.manifest.registry_url.as_deref(),
            Some("https://registry.example.com/api/registry")
        );
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let result = load_with_env(Some(Path::new("/nonexistent/mosaic.toml")), &env(&[]));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn test_try_load_file_missing() {
        let result = try_load_file(Path::new("/nonexistent/config.toml")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_malformed_file() {
        let (_dir, path) = write_config("[resolution\nmax_retries = ");
        let result = load_with_env(Some(&path), &env(&[]));
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let (_dir, path) = write_config("[resolution]\nbase_delay_ms = 0");
        let result = load_with_env(Some(&path), &env(&[]));
        assert!(matches!(
            result,
            Err(ConfigError::ValidationError { ref field, .. }) if field == "resolution.base_delay_ms"
        ));
    }

    #[test]
    fn test_oversized_config_rejected() {
        let data = "x = \"".to_owned() + &"a".repeat(1_100_000) + "\"";
        let (_dir, path) = write_config(&data);

        let result = try_load_file(&path);
        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn test_from_toml_str() {
        let config = from_toml_str("[telemetry]\nbuffer_size = 50").unwrap();
        assert_eq!(config.telemetry.buffer_size, 50);
        assert!(from_toml_str("[telemetry]\nbuffer_size = 0").is_err());
    }
}
