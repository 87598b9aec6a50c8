//! Config command - print the effective configuration.

use mosaic_config::Config;

use crate::formatter::OutputFormat;

/// Print `cfg` as TOML or JSON.
pub(crate) fn show_config(cfg: &Config, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(cfg)?),
        OutputFormat::Table => print!("{}", cfg.to_toml_string()?),
    }
    Ok(())
}
