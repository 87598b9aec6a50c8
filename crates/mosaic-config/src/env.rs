//! Environment variable fallbacks.
//!
//! Variables are **fallbacks**, not overrides: they only apply to fields the
//! user config file left unset.

use std::collections::{BTreeSet, HashMap};
use std::hash::BuildHasher;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

#[derive(Debug, Clone, Copy)]
enum Kind {
    Str,
    Int,
    Bool,
}

struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
    kind: Kind,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "MOSAIC_REGISTRY_URL",
        field_path: "manifest.registry_url",
        kind: Kind::Str,
    },
    EnvMapping {
        var_name: "MOSAIC_CATALOG_FILE",
        field_path: "manifest.catalog_file",
        kind: Kind::Str,
    },
    EnvMapping {
        var_name: "MOSAIC_CACHE_DIR",
        field_path: "manifest.cache_dir",
        kind: Kind::Str,
    },
    EnvMapping {
        var_name: "MOSAIC_CACHE_TTL_SECS",
        field_path: "manifest.cache_ttl_secs",
        kind: Kind::Int,
    },
    EnvMapping {
        var_name: "MOSAIC_MAX_RETRIES",
        field_path: "resolution.max_retries",
        kind: Kind::Int,
    },
    EnvMapping {
        var_name: "MOSAIC_ATTEMPT_TIMEOUT_MS",
        field_path: "resolution.attempt_timeout_ms",
        kind: Kind::Int,
    },
    EnvMapping {
        var_name: "MOSAIC_TELEMETRY_ENABLED",
        field_path: "telemetry.enabled",
        kind: Kind::Bool,
    },
    EnvMapping {
        var_name: "MOSAIC_TELEMETRY_ENDPOINT",
        field_path: "telemetry.endpoint",
        kind: Kind::Str,
    },
    EnvMapping {
        var_name: "MOSAIC_LOG_LEVEL",
        field_path: "logging.level",
        kind: Kind::Str,
    },
    EnvMapping {
        var_name: "MOSAIC_LOG_FORMAT",
        field_path: "logging.format",
        kind: Kind::Str,
    },
];

/// Snapshot the process environment.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Apply `MOSAIC_*` fallbacks to fields not listed in `file_fields`.
///
/// Returns the number of variables applied.
///
/// # Errors
///
/// Returns [`ConfigError::EnvError`] if a numeric or boolean variable does
/// not parse.
pub fn apply_env_fallbacks<S: BuildHasher>(
    merged: &mut toml::Value,
    file_fields: &BTreeSet<String>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<usize> {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        if file_fields.contains(mapping.field_path) {
            continue;
        }
        let Some(raw) = env_vars.get(mapping.var_name) else {
            continue;
        };

        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var fallback"
        );
        let value = coerce(mapping, raw)?;
        set_field(merged, mapping.field_path, value);
        count = count.saturating_add(1);
    }

    Ok(count)
}

fn coerce(mapping: &EnvMapping, raw: &str) -> ConfigResult<toml::Value> {
    let raw = raw.trim();
    match mapping.kind {
        Kind::Str => Ok(toml::Value::String(raw.to_owned())),
        Kind::Int => raw
            .parse::<i64>()
            .map(toml::Value::Integer)
            .map_err(|e| ConfigError::EnvError {
                var_name: mapping.var_name.to_owned(),
                message: format!("expected an integer: {e}"),
            }),
        Kind::Bool => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(toml::Value::Boolean(true)),
            "0" | "false" | "no" | "off" => Ok(toml::Value::Boolean(false)),
            _ => Err(ConfigError::EnvError {
                var_name: mapping.var_name.to_owned(),
                message: format!("expected a boolean, got '{raw}'"),
            }),
        },
    }
}

/// Set `section.key` in `root`, creating the section table if needed.
fn set_field(root: &mut toml::Value, path: &str, value: toml::Value) {
    let Some((section, key)) = path.split_once('.') else {
        return;
    };
    let Some(root) = root.as_table_mut() else {
        return;
    };
    let table = root
        .entry(section.to_owned())
        .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    if let Some(table) = table.as_table_mut() {
        table.insert(key.to_owned(), value);
    }
}
