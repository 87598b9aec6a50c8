//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Config, LoggingSection, ManifestSection, ResolutionSection, TelemetrySection};

/// Upper bound for `resolution.max_retries`.
const MAX_RETRIES_UPPER_BOUND: u32 = 10;

/// Validate a fully-merged configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_resolution(&config.resolution)?;
    validate_manifest(&config.manifest)?;
    validate_telemetry(&config.telemetry)?;
    validate_logging(&config.logging)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn validate_resolution(r: &ResolutionSection) -> ConfigResult<()> {
    if r.max_retries > MAX_RETRIES_UPPER_BOUND {
        return Err(invalid(
            "resolution.max_retries",
            format!("must be at most {MAX_RETRIES_UPPER_BOUND}"),
        ));
    }
    if r.base_delay_ms == 0 {
        return Err(invalid("resolution.base_delay_ms", "must be greater than 0"));
    }
    if r.max_delay_ms < r.base_delay_ms {
        return Err(invalid(
            "resolution.max_delay_ms",
            format!("must be at least base_delay_ms ({})", r.base_delay_ms),
        ));
    }
    if r.attempt_timeout_ms == 0 {
        return Err(invalid(
            "resolution.attempt_timeout_ms",
            "must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_manifest(m: &ManifestSection) -> ConfigResult<()> {
    match (&m.registry_url, &m.catalog_file) {
        (None, None) => {
            return Err(invalid(
                "manifest.registry_url",
                "either registry_url or catalog_file must be set",
            ));
        },
        (Some(url), _) if !is_http_url(url) => {
            return Err(invalid(
                "manifest.registry_url",
                format!("'{url}' is not an http(s) URL"),
            ));
        },
        _ => {},
    }
    if m.fetch_timeout_ms == 0 {
        return Err(invalid("manifest.fetch_timeout_ms", "must be greater than 0"));
    }
    if m.cache_ttl_secs == 0 {
        return Err(invalid("manifest.cache_ttl_secs", "must be greater than 0"));
    }
    if m.cache_key.trim().is_empty() {
        return Err(invalid("manifest.cache_key", "must not be empty"));
    }
    Ok(())
}

fn validate_telemetry(t: &TelemetrySection) -> ConfigResult<()> {
    if t.buffer_size == 0 {
        return Err(invalid("telemetry.buffer_size", "must be greater than 0"));
    }
    match &t.endpoint {
        None if t.enabled => Err(invalid(
            "telemetry.endpoint",
            "required when telemetry is enabled",
        )),
        Some(url) if !is_http_url(url) => Err(invalid(
            "telemetry.endpoint",
            format!("'{url}' is not an http(s) URL"),
        )),
        _ => Ok(()),
    }
}

fn validate_logging(l: &LoggingSection) -> ConfigResult<()> {
    if l.level.trim().is_empty() {
        return Err(invalid("logging.level", "must not be empty"));
    }
    if !matches!(
        l.format.to_ascii_lowercase().as_str(),
        "pretty" | "compact" | "json" | "full"
    ) {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported format '{}'; expected one of: pretty, compact, json, full",
                l.format
            ),
        ));
    }
    Ok(())
}
