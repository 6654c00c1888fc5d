//! Error types for the Murmur foundation layer
//!
//! Every error this crate can produce lives here, so call sites can tell
//! "cache degraded, keep going" apart from genuine logic bugs.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Murmur foundation error type
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // Cache backends
    // ========================================================================
    /// A backend could not be initialized. Consumed by the fallback chain,
    /// never surfaced to cache callers.
    #[error("Backend unavailable: {backend} - {message}")]
    BackendUnavailable { backend: String, message: String },

    /// A single backend operation failed. Callers treat this as a miss
    /// (reads) or a no-op (writes).
    #[error("Backend operation failed: {backend} - {message}")]
    BackendOperation { backend: String, message: String },

    #[error("Serialization failed: {0}")]
    Serialization(String),

    // ========================================================================
    // External error conversions
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    // ========================================================================
    // General
    // ========================================================================
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the error only degrades the cache (request can proceed as a
    /// miss/no-op) rather than signaling a logic bug.
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            Error::BackendUnavailable { .. }
                | Error::BackendOperation { .. }
                | Error::Serialization(_)
                | Error::Sqlite(_)
                | Error::Redis(_)
                | Error::Io(_)
        )
    }

    /// Backend initialization error helper
    pub fn backend_unavailable(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Error::BackendUnavailable {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Backend operation error helper
    pub fn backend_op(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Error::BackendOperation {
            backend: backend.into(),
            message: message.into(),
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
