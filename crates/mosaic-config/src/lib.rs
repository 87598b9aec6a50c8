//! Layered configuration for the Mosaic shell.
//!
//! # Usage
//!
//! ```rust,no_run
//! use mosaic_config::Config;
//!
//! # fn main() -> Result<(), mosaic_config::ConfigError> {
//! let config = Config::load(None)?;
//! println!("registry: {:?}", config.manifest.registry_url);
//! # Ok(())
//! # }
//! ```
//!
//! # Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **User file** (`--config <FILE>` or the platform config dir)
//! 2. **Environment variables** (`MOSAIC_*`), fallback only
//! 3. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! This crate depends on no other internal crate. Conversion into domain
//! types happens where the shell is assembled.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

/// Environment variable fallbacks.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// TOML tree merging.
pub mod merge;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub mod prelude;

pub use error::{ConfigError, ConfigResult};
pub use loader::default_config_path;
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// # Errors
    ///
    /// See [`loader::load`].
    pub fn load(path: Option<&std::path::Path>) -> ConfigResult<Self> {
        loader::load(path)
    }

    /// Parse a TOML document layered over the defaults.
    ///
    /// # Errors
    ///
    /// See [`loader::from_toml_str`].
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        loader::from_toml_str(content)
    }

    /// Render as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
