//! Mosaic CLI - inspect catalogs and resolve remotes from the terminal.
//!
//! Runs the same catalog loader and resolution engine as an embedded shell,
//! so a route that fails here fails the same way in a session.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod commands;
mod formatter;
mod theme;

use commands::{cache, config, resolve, validate};
use formatter::OutputFormat;
use mosaic_runtime::config_bridge;

/// Mosaic - resilient remote resolution for composed frontends
#[derive(Parser)]
#[command(name = "mosaic")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "MOSAIC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a catalog file
    Validate {
        /// Catalog JSON file
        file: PathBuf,
    },

    /// Load the catalog and resolve remotes for a user
    Resolve {
        /// User to resolve for (drives canary assignment)
        #[arg(short, long)]
        user: String,

        /// Resolve only this route
        #[arg(short, long)]
        route: Option<String>,
    },

    /// Inspect or clear the last-known-good catalog cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Show the cached catalog
    Show,
    /// Delete the cached catalog
    Clear,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = load_config(cli.config.as_deref())?;

    // Set up logging from config, with --verbose override.
    let mut log_config = config_bridge::to_log_config(&cfg);
    if cli.verbose {
        "debug".clone_into(&mut log_config.level);
    }
    if let Err(e) = mosaic_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match cli.command {
        Commands::Validate { file } => validate::run_validate(&file, cli.format).await,
        Commands::Resolve { user, route } => {
            resolve::run_resolve(&cfg, &user, route.as_deref(), cli.format).await
        },
        Commands::Cache { command } => match command {
            CacheCommands::Show => cache::show_cache(&cfg, cli.format),
            CacheCommands::Clear => cache::clear_cache(&cfg),
        },
        Commands::Config { command } => match command {
            ConfigCommands::Show => config::show_config(&cfg, cli.format),
        },
    }
}

fn load_config(path: Option<&Path>) -> Result<mosaic_config::Config> {
    mosaic_config::Config::load(path).with_context(|| match path {
        Some(path) => format!("failed to load configuration from {}", path.display()),
        None => "failed to load configuration".to_owned(),
    })
}
