//! Error types for repository operations.

use lodestore_protocol::ResourceUri;
use thiserror::Error;

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The resource does not exist where presence was required.
    #[error("resource not found: {uri}")]
    NotFound {
        /// The URI that was dereferenced.
        uri: ResourceUri,
    },

    /// The resource was deleted and a tombstone marker remains.
    #[error("resource gone, tombstone remains: {uri}")]
    Gone {
        /// The URI of the deleted resource.
        uri: ResourceUri,
    },

    /// The repository rejected a conditional write.
    #[error("version conflict on {uri}")]
    Conflict {
        /// The URI the write targeted.
        uri: ResourceUri,
    },

    /// Network or transport failure.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The repository returned a malformed or unexpected response.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Invalid protocol data (URI or slug validation).
    #[error("data error: {0}")]
    Data(#[from] lodestore_protocol::ProtocolError),
}

impl RepositoryError {
    /// Creates a not-found error.
    pub fn not_found(uri: ResourceUri) -> Self {
        Self::NotFound { uri }
    }

    /// Creates a gone error.
    pub fn gone(uri: ResourceUri) -> Self {
        Self::Gone { uri }
    }

    /// Creates a version-conflict error.
    pub fn conflict(uri: ResourceUri) -> Self {
        Self::Conflict { uri }
    }

    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, RepositoryError::Transport { retryable: true, .. })
    }
}
