//! Validate command - check a catalog file before publishing it.

use std::path::Path;

use anyhow::{Context, bail};
use colored::Colorize;
use serde_json::json;

use mosaic_core::{Catalog, RolloutConfig};
use mosaic_manifest::validate_str;

use crate::formatter::OutputFormat;
use crate::theme::Theme;

/// Validate `file` and print its routes.
pub(crate) async fn run_validate(file: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;

    let catalog = match validate_str(&text) {
        Ok(catalog) => catalog,
        Err(e) => {
            match format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "valid": false,
                        "path": e.path,
                        "reason": e.reason,
                    }))?
                ),
                OutputFormat::Table => println!("{}", Theme::error(&e.to_string())),
            }
            bail!("catalog {} is invalid", file.display());
        },
    };

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "valid": true,
                "catalog": catalog.to_wire(),
            }))?
        ),
        OutputFormat::Table => print_routes(&catalog),
    }
    Ok(())
}

fn print_routes(catalog: &Catalog) {
    println!(
        "\n{}",
        Theme::header(&format!("Catalog {}", catalog.platform()))
    );
    println!(
        "{:<14} {:<16} {:<20} {:<10} {:<14} {}",
        "ROUTE".dimmed(),
        "PATH".dimmed(),
        "SCOPE".dimmed(),
        "STABLE".dimmed(),
        "CANARY".dimmed(),
        "ROLLOUT".dimmed()
    );
    println!("{}", Theme::separator());

    for route in catalog.routes() {
        let remote = &route.remote;
        println!(
            "{:<14} {:<16} {:<20} {:<10} {:<14} {}",
            route.id,
            route.path,
            remote.scope,
            remote.stable.version,
            remote.canary.version,
            rollout_label(&remote.rollout)
        );
    }

    println!();
    println!(
        "{}",
        Theme::success(&format!("{} route(s) valid", catalog.routes().len()))
    );
}

fn rollout_label(rollout: &RolloutConfig) -> String {
    if rollout.canary_enabled {
        format!("{}%", rollout.canary_percentage)
    } else {
        "off".to_owned()
    }
}
