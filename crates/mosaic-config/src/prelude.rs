//! Prelude module - commonly used types for convenient import.
//!
//! Use `use mosaic_config::prelude::*;` to import all essential types.

pub use crate::{
    Config, ConfigError, ConfigResult, LoggingSection, ManifestSection, ResolutionSection,
    TelemetrySection,
};
