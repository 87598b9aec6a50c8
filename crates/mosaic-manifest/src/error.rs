//! Catalog error types.

use thiserror::Error;

/// An untrusted catalog payload was rejected.
///
/// `path` locates the first offending field in document order, e.g.
/// `routes[0].remote.rollout.canaryPercentage`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid manifest: {path} {reason}")]
pub struct ValidationError {
    /// Field path of the violation.
    pub path: String,
    /// What is wrong with it.
    pub reason: String,
}

impl ValidationError {
    pub(crate) fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Persistent store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem access failed.
    #[error("Store I/O error at {path}: {source}")]
    Io {
        /// File or directory involved.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Keys must be plain file-name-safe identifiers.
    #[error("Invalid store key: {0}")]
    InvalidKey(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Reasons a cached catalog could not be used.
///
/// Never surfaced to callers of [`crate::ManifestCache::read`]; every variant
/// is a cache miss there.
#[derive(Debug, Error)]
pub enum CacheError {
    /// No persistent store is configured.
    #[error("Cache storage unavailable")]
    Unavailable,

    /// Nothing stored under the key.
    #[error("No cached catalog")]
    Missing,

    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The envelope is not valid JSON of the expected shape.
    #[error("Malformed cache envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The envelope has outlived its TTL.
    #[error("Cached catalog expired at {expires_at}")]
    Expired {
        /// Expiry, in milliseconds since the epoch.
        expires_at: u64,
    },

    /// The cached value no longer passes validation.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Catalog source and loading failures.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The registry did not answer in time.
    #[error("Registry request to {url} timed out after {timeout_ms}ms")]
    Timeout {
        /// Registry URL.
        url: String,
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// The registry answered with a non-success status.
    #[error("Registry request to {url} failed with HTTP {status}")]
    Status {
        /// Registry URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// Transport-level failure.
    #[error("Registry request to {url} failed: {message}")]
    Transport {
        /// Registry URL.
        url: String,
        /// Error details.
        message: String,
    },

    /// A local catalog file could not be read.
    #[error("Failed to read catalog file {path}: {source}")]
    Read {
        /// File path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The payload is not JSON.
    #[error("Catalog payload is not valid JSON: {0}")]
    Decode(String),

    /// The payload is JSON but not a valid catalog.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// Neither the source nor the cache produced a catalog.
    #[error("Catalog unavailable: {reason}")]
    Unavailable {
        /// Why the source failed.
        reason: String,
    },
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;
