//! Output format selection.

use clap::ValueEnum;

/// How command results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable tables.
    Table,
    /// Machine-readable JSON on stdout.
    Json,
}
