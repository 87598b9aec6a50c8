//! CLI subcommands.

pub(crate) mod cache;
pub(crate) mod config;
pub(crate) mod resolve;
pub(crate) mod validate;
