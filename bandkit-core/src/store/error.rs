//! Error types for the relational store.

use thiserror::Error;

/// Result type for store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by the relational store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Errors coming from the database driver.
    #[error("db error: {0}")]
    Db(String),

    /// A uniqueness or foreign-key constraint fired.
    ///
    /// Call sites that expect a conflict (claim race, duplicate email,
    /// duplicate identifier) intercept this variant and map it to the
    /// matching typed outcome; everywhere else it surfaces as an
    /// integrity violation.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Cryptographic failure (password hashing).
    #[error("crypto error: {0}")]
    Crypto(String),

    /// The connection mutex was poisoned by a panicking thread.
    #[error("store connection poisoned")]
    Poisoned,
}

pub(crate) fn map_db_err(err: &rusqlite::Error) -> StorageError {
    if err.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation) {
        StorageError::Constraint(err.to_string())
    } else {
        StorageError::Db(err.to_string())
    }
}

pub(crate) fn to_i64(value: u64, label: &str) -> StorageResult<i64> {
    i64::try_from(value)
        .map_err(|_| StorageError::Db(format!("{label} out of range for i64: {value}")))
}

pub(crate) fn to_u64(value: i64, label: &str) -> StorageResult<u64> {
    u64::try_from(value)
        .map_err(|_| StorageError::Db(format!("{label} out of range for u64: {value}")))
}
