//! Error types for protocol data.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur when constructing protocol data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A resource URI failed validation.
    #[error("invalid resource URI: {message}")]
    InvalidUri {
        /// Description of the problem.
        message: String,
    },

    /// A child slug failed validation.
    #[error("invalid child slug: {message}")]
    InvalidSlug {
        /// Description of the problem.
        message: String,
    },
}

impl ProtocolError {
    /// Creates an invalid URI error.
    pub fn invalid_uri(message: impl Into<String>) -> Self {
        Self::InvalidUri {
            message: message.into(),
        }
    }

    /// Creates an invalid slug error.
    pub fn invalid_slug(message: impl Into<String>) -> Self {
        Self::InvalidSlug {
            message: message.into(),
        }
    }
}
