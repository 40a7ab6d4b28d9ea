//! Password policy and argon2id hashing.
//!
//! Hashing is intentionally slow and CPU-bound. Callers on cooperative
//! single-threaded runtimes should run [`hash`] and [`verify`] off the main
//! request-handling path.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::error::{CoreError, CoreResult};
use crate::store::StorageError;

const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 128;

/// Checks the account password policy.
pub(super) fn check_policy(password: &str) -> CoreResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CoreError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if password.chars().count() > MAX_PASSWORD_LEN {
        return Err(CoreError::WeakPassword("password is too long".to_string()));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(CoreError::WeakPassword(
            "password must contain an uppercase letter".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(CoreError::WeakPassword(
            "password must contain a lowercase letter".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(CoreError::WeakPassword(
            "password must contain a number".to_string(),
        ));
    }
    Ok(())
}

/// Hashes a password with argon2id and a fresh salt.
pub(super) fn hash(password: &str) -> CoreResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| CoreError::from(StorageError::Crypto(err.to_string())))?;
    Ok(hash.to_string())
}

/// Verifies a password against a stored argon2id hash.
///
/// A malformed stored hash verifies as false rather than erroring: the
/// caller cannot act on the difference and must not learn it.
pub(super) fn verify(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}
