//! Mosaic Runtime - remote resolution and the shell session.
//!
//! This crate provides:
//! - The resolution engine: variant choice, deduplicated time-bounded
//!   fetches, bounded retries and canary-to-stable fallback
//! - The status registry with no-op suppression
//! - The [`Shell`] session that wires catalog, engine, status and events
//! - The bridge from `mosaic-config` to all of the above
//!
//! # Example
//!
//! ```rust,no_run
//! use mosaic_config::Config;
//! use mosaic_runtime::Shell;
//! use mosaic_telemetry::ClientContext;
//!
//! # async fn example() -> Result<(), mosaic_runtime::RuntimeError> {
//! let config = Config::load(None).map_err(|e| mosaic_runtime::RuntimeError::Config(e.to_string()))?;
//! let shell = Shell::from_config(&config, ClientContext::new("alice"))?;
//!
//! shell.load_catalog().await?;
//! for (route_id, result) in shell.resolve_all().await {
//!     println!("{route_id}: {}", if result.is_ok() { "loaded" } else { "failed" });
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config_bridge;
pub mod prelude;

mod cache;
mod engine;
mod error;
mod loader;
mod shell;
mod status;

pub use cache::ResolutionCache;
pub use engine::{DEFAULT_ATTEMPT_TIMEOUT, EngineConfig, ResolutionEngine, ResolvedRemote};
pub use error::{RuntimeError, RuntimeResult};
pub use loader::{HttpRemoteLoader, LoadRequest, RemoteLoader, RemoteModule, alternate_entry_url};
pub use shell::{Shell, ShellBuilder};
pub use status::StatusRegistry;
