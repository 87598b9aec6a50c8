//! Cache command - inspect or clear the last-known-good catalog.

use anyhow::bail;
use chrono::DateTime;
use serde_json::json;

use mosaic_config::Config;
use mosaic_manifest::{CacheError, now_ms};
use mosaic_runtime::config_bridge;

use crate::formatter::OutputFormat;
use crate::theme::Theme;

/// Print the cached catalog envelope.
pub(crate) fn show_cache(cfg: &Config, format: OutputFormat) -> anyhow::Result<()> {
    let cache = config_bridge::to_manifest_cache(cfg);
    let entry = match cache.peek() {
        Ok(entry) => entry,
        Err(CacheError::Missing | CacheError::Unavailable) => {
            match format {
                OutputFormat::Json => println!("null"),
                OutputFormat::Table => println!(
                    "{}",
                    Theme::info(&format!("No cached catalog under {}", cache.key()))
                ),
            }
            return Ok(());
        },
        Err(e) => bail!("cached catalog is unusable: {e}"),
    };
    let expired = entry.is_expired(now_ms());

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "key": cache.key(),
                "cachedAt": entry.cached_at,
                "expiresAt": entry.expires_at,
                "expired": expired,
                "catalog": entry.catalog.to_wire(),
            }))?
        ),
        OutputFormat::Table => {
            println!("\n{}", Theme::header("Manifest cache"));
            println!("{}", Theme::separator());
            println!("  Key:       {}", cache.key());
            println!("  Cached at: {}", format_ms(entry.cached_at));
            println!("  Expires:   {}", format_ms(entry.expires_at));
            println!("  Platform:  {}", entry.catalog.platform());
            println!("  Routes:    {}", entry.catalog.routes().len());
            println!();
            if expired {
                println!("{}", Theme::warning("Expired; the next load will discard it"));
            } else {
                println!("{}", Theme::success("Fresh"));
            }
        },
    }
    Ok(())
}

/// Delete the cached catalog.
pub(crate) fn clear_cache(cfg: &Config) -> anyhow::Result<()> {
    let cache = config_bridge::to_manifest_cache(cfg);
    if !cache.is_available() {
        println!("{}", Theme::info("No cache directory configured"));
        return Ok(());
    }
    if !cache.purge() {
        bail!("failed to clear cached catalog {}", cache.key());
    }
    println!(
        "{}",
        Theme::success(&format!("Cleared cached catalog {}", cache.key()))
    );
    Ok(())
}

fn format_ms(ms: u64) -> String {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map_or_else(|| ms.to_string(), |at| at.to_rfc3339())
}
