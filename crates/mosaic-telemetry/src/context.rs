//! Client context for correlating logs, telemetry and registry requests.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User id recorded when no user is signed in.
pub const ANONYMOUS_USER: &str = "anonymous";

fn prefixed_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

/// Generate a fresh request id (`request-<uuid>`).
#[must_use]
pub fn new_request_id() -> String {
    prefixed_id("request")
}

/// Identity of one shell session.
///
/// The session id is fixed for the lifetime of the shell; request ids are
/// minted per outgoing call with [`ClientContext::request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContext {
    /// Session identifier (`session-<uuid>`).
    pub session_id: String,
    /// Signed-in user, or [`ANONYMOUS_USER`].
    pub user_id: String,
}

impl ClientContext {
    /// Start a new session for `user_id`.
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            session_id: prefixed_id("session"),
            user_id: user_id.into(),
        }
    }

    /// Start a new session with no signed-in user.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS_USER)
    }

    /// Replace the user, keeping the session id.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    /// Mint ids for one outgoing request.
    #[must_use]
    pub fn request(&self) -> RequestIds {
        let request_id = new_request_id();
        RequestIds {
            correlation_id: request_id.clone(),
            request_id,
        }
    }

    /// Tracing span carrying the session identity.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "session",
            session_id = %self.session_id,
            user_id = %self.user_id,
        )
    }

    /// Header pairs for an outgoing request.
    #[must_use]
    pub fn headers(&self, ids: &RequestIds) -> [(&'static str, String); 4] {
        [
            ("X-Session-Id", self.session_id.clone()),
            ("X-Request-Id", ids.request_id.clone()),
            ("X-Correlation-Id", ids.correlation_id.clone()),
            ("X-User-Id", self.user_id.clone()),
        ]
    }
}

impl Default for ClientContext {
    fn default() -> Self {
        Self::anonymous()
    }
}

/// Identifiers for one outgoing request. The correlation id starts out equal
/// to the request id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIds {
    /// Request identifier (`request-<uuid>`).
    pub request_id: String,
    /// Correlation identifier.
    pub correlation_id: String,
}
