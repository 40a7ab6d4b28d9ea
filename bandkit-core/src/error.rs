//! Error taxonomy for the band core.
//!
//! Every outcome listed here is an expected, typed result returned to the
//! calling boundary. Only [`CoreError::Storage`] wraps genuinely unexpected
//! store failures; it carries no internal detail beyond the driver message.

use thiserror::Error;

use crate::store::StorageError;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors returned by the band core operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoreError {
    /// Malformed input; the caller can correct it and retry.
    #[error("validation error: {0}")]
    Validation(String),

    /// Password does not meet the account policy.
    #[error("password rejected: {0}")]
    WeakPassword(String),

    /// Missing or invalid session, or bad login credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// The caller is authenticated but does not own the target resource.
    #[error("forbidden")]
    Forbidden,

    /// The requested record does not exist.
    #[error("not found")]
    NotFound,

    /// The identifier is not a provisioned band.
    #[error("band identifier is not recognized")]
    UnrecognizedToken,

    /// The presented secret does not match the provisioned secret.
    #[error("band secret does not match")]
    SecretMismatch,

    /// The band is already bound to an account.
    #[error("band already claimed")]
    AlreadyClaimed,

    /// An account already exists for this email.
    #[error("email already registered")]
    EmailTaken,

    /// A provisioned band already exists for this identifier.
    #[error("identifier already provisioned")]
    DuplicateIdentifier,

    /// Too many attempts for this caller and action.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until the attempt window resets. Always positive.
        retry_after_secs: u64,
    },

    /// Document payload exceeds the configured byte limit.
    #[error("document too large: {size} bytes exceeds limit of {limit}")]
    TooLarge {
        /// Size of the rejected payload.
        size: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// Document payload does not look like the expected format.
    #[error("document payload is not a PDF")]
    WrongFormat,

    /// A store-level constraint fired where no conflict was expected.
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// Unexpected store failure, fatal to the request.
    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Constraint(message) => Self::Integrity(message),
            other => Self::Storage(other),
        }
    }
}
