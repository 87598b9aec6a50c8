//! Mosaic Test - Shared test utilities for the Mosaic remote shell.
//!
//! This crate provides scripted collaborators and catalog fixtures that can
//! be used across Mosaic crates as a dev-dependency.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! mosaic-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use mosaic_test::{MockOutcome, ShellHarness, canary_route_json, catalog_json, canary_url};
//!
//! #[tokio::test]
//! async fn test_canary_falls_back() {
//!     let harness = ShellHarness::new(catalog_json(vec![canary_route_json("accounts", 100.0)]));
//!     harness.loader.set_outcome(canary_url("accounts"), MockOutcome::NotFound);
//!
//!     harness.shell.load_catalog().await.unwrap();
//!     let resolved = harness.shell.resolve("accounts").await.unwrap();
//!     assert!(resolved.degraded);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;
