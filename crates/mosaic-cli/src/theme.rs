//! CLI theme and styling.

use colored::Colorize;

use mosaic_core::LoadState;

/// CLI theme configuration.
pub(crate) struct Theme;

impl Theme {
    /// Format a header.
    pub(crate) fn header(text: &str) -> String {
        format!("{}", text.bold().cyan())
    }

    /// Format a success message.
    pub(crate) fn success(text: &str) -> String {
        format!("{} {}", "✓".green(), text)
    }

    /// Format an error message.
    pub(crate) fn error(text: &str) -> String {
        format!("{} {}", "✗".red(), text.red())
    }

    /// Format a warning message.
    pub(crate) fn warning(text: &str) -> String {
        format!("{} {}", "!".yellow(), text.yellow())
    }

    /// Format an info message.
    pub(crate) fn info(text: &str) -> String {
        format!("{} {}", "i".blue(), text)
    }

    /// Format a dimmed message.
    pub(crate) fn dimmed(text: &str) -> String {
        format!("{}", text.dimmed())
    }

    /// Format a separator line.
    pub(crate) fn separator() -> String {
        "━".repeat(72).dimmed().to_string()
    }

    /// Format a load state, padded to `width` before coloring.
    pub(crate) fn state(state: LoadState, degraded: bool, width: usize) -> String {
        let label = if degraded && state == LoadState::Loaded {
            "degraded"
        } else {
            state.as_str()
        };
        let padded = format!("{label:<width$}");
        match (state, degraded) {
            (LoadState::Loaded, false) => padded.green().to_string(),
            (LoadState::Loaded, true) => padded.yellow().to_string(),
            (LoadState::Error, _) => padded.red().to_string(),
            (LoadState::Loading, _) => padded.cyan().to_string(),
            (LoadState::Idle, _) => padded.dimmed().to_string(),
        }
    }
}
