//! Mosaic Core - shared model for composing independently deployed remotes.
//!
//! This crate provides:
//! - The typed catalog model ([`Catalog`], [`RouteDescriptor`], [`RemoteConfig`])
//! - Per-remote runtime status ([`RemoteStatus`]) and partial updates ([`StatusPatch`])
//! - Deterministic canary bucketing ([`rollout`])
//! - Bounded exponential backoff ([`backoff`])
//! - The resolution error taxonomy ([`ResolutionError`])
//!
//! Catalog values are only ever produced by the manifest validator in
//! `mosaic-manifest`; nothing downstream re-inspects raw catalog payloads.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod backoff;
pub mod prelude;
pub mod rollout;

mod catalog;
mod error;
mod status;

pub use backoff::BackoffPolicy;
pub use catalog::{Catalog, RemoteConfig, RemoteTarget, Role, RolloutConfig, RouteDescriptor, Variant};
pub use error::{ResolutionError, ResolutionResult};
pub use status::{LoadState, RemoteStatus, StatusPatch};
