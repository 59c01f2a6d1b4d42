//! Error types for the persistence engine.

use lodestore_protocol::{ProtocolError, ResourceUri};
use lodestore_repository::RepositoryError;
use thiserror::Error;

/// Result type for engine operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in persistence operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Mutation or save attempted on a read-only or frozen resource.
    /// Raised before any network interaction.
    #[error("read-only resource: {message}")]
    ReadOnly {
        /// Description of the rejected operation.
        message: String,
    },

    /// Remote resource absent where presence was required.
    #[error("object not found: {uri}")]
    ObjectNotFound {
        /// The URI that was dereferenced.
        uri: ResourceUri,
    },

    /// Access to an undeclared, non-ad-hoc contained-resource slug.
    #[error("unknown contained resource: {slug}")]
    UnknownChild {
        /// The slug that was requested.
        slug: String,
    },

    /// Access to a field with no entry in the field map.
    #[error("unknown delegated field: {field}")]
    UnknownField {
        /// The field that was requested.
        field: String,
    },

    /// Invalid child or field declaration. Raised at declaration time,
    /// never at save time.
    #[error("invalid declaration: {message}")]
    InvalidDeclaration {
        /// Description of the problem.
        message: String,
    },

    /// A call-time argument violated a declared constraint.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// An operation required an identity that has not been assigned.
    #[error("resource has no identity: {message}")]
    IdentityMissing {
        /// Description of the operation that needed the identity.
        message: String,
    },

    /// Identity reassignment attempted; identities are immutable once
    /// assigned.
    #[error("identity already assigned: {uri}")]
    IdentityAssigned {
        /// The identity already held by the resource.
        uri: ResourceUri,
    },

    /// Invalid protocol data (URI or slug validation).
    #[error("data error: {0}")]
    Data(#[from] ProtocolError),

    /// Repository error, passed through unchanged except for the
    /// not-found translation below.
    #[error("repository error: {0}")]
    Repository(RepositoryError),
}

impl CoreError {
    /// Creates a read-only error.
    pub fn read_only(message: impl Into<String>) -> Self {
        Self::ReadOnly {
            message: message.into(),
        }
    }

    /// Creates an unknown-child error.
    pub fn unknown_child(slug: impl Into<String>) -> Self {
        Self::UnknownChild { slug: slug.into() }
    }

    /// Creates an unknown-field error.
    pub fn unknown_field(field: impl Into<String>) -> Self {
        Self::UnknownField {
            field: field.into(),
        }
    }

    /// Creates an invalid-declaration error.
    pub fn invalid_declaration(message: impl Into<String>) -> Self {
        Self::InvalidDeclaration {
            message: message.into(),
        }
    }

    /// Creates an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an identity-missing error.
    pub fn identity_missing(message: impl Into<String>) -> Self {
        Self::IdentityMissing {
            message: message.into(),
        }
    }
}

impl From<RepositoryError> for CoreError {
    /// Translates the transport-level "not found" signal into the
    /// domain taxonomy; every other repository error passes through
    /// unchanged.
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { uri } => CoreError::ObjectNotFound { uri },
            other => CoreError::Repository(other),
        }
    }
}
