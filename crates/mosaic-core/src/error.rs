//! Resolution error taxonomy.

use thiserror::Error;

/// Errors produced while resolving a remote.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// A single attempt exceeded its time budget.
    #[error("Remote {scope} timed out after {timeout_ms}ms")]
    Timeout {
        /// Remote scope.
        scope: String,
        /// Budget that was exceeded.
        timeout_ms: u64,
    },

    /// The entry point definitely does not exist.
    #[error("Remote entry not found at {url}: {message}")]
    NotFound {
        /// Entry URL that was requested.
        url: String,
        /// Details from the loader.
        message: String,
    },

    /// Any other failure; worth retrying.
    #[error("Remote load failed for {url}: {message}")]
    Transient {
        /// Entry URL that was requested.
        url: String,
        /// Details from the loader.
        message: String,
    },

    /// The canary failed and so did the stable fallback.
    #[error("Canary failed ({canary_error}); stable fallback failed: {fallback_error}")]
    CanaryFallbackExhausted {
        /// Why the canary failed.
        canary_error: String,
        /// Why the stable fallback failed.
        fallback_error: String,
    },

    /// A newer resolution took over the route.
    #[error("Resolution of route {route_id} was superseded by a retry")]
    Superseded {
        /// Route whose resolution was replaced.
        route_id: String,
    },
}

impl ResolutionError {
    /// Whether the retry schedule should continue after this error.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transient { .. })
    }

    /// Short machine-readable kind for logs and telemetry metadata.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::NotFound { .. } => "not_found",
            Self::Transient { .. } => "transient",
            Self::CanaryFallbackExhausted { .. } => "canary_fallback_exhausted",
            Self::Superseded { .. } => "superseded",
        }
    }
}

/// Result type for resolution operations.
pub type ResolutionResult<T> = Result<T, ResolutionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let timeout = ResolutionError::Timeout {
            scope: "remote_accounts".to_string(),
            timeout_ms: 15_000,
        };
        let missing = ResolutionError::NotFound {
            url: "http://x/remoteEntry.js".to_string(),
            message: "404".to_string(),
        };
        let transient = ResolutionError::Transient {
            url: "http://x/remoteEntry.js".to_string(),
            message: "connection reset".to_string(),
        };

        assert!(timeout.is_retryable());
        assert!(transient.is_retryable());
        assert!(!missing.is_retryable());
        assert_eq!(missing.kind(), "not_found");
    }

    #[test]
    fn test_timeout_message() {
        let err = ResolutionError::Timeout {
            scope: "remote_billing".to_string(),
            timeout_ms: 15_000,
        };
        assert_eq!(err.to_string(), "Remote remote_billing timed out after 15000ms");
    }
}
