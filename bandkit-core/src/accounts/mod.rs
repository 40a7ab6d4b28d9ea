//! Credential store: user accounts and opaque session tokens.
//!
//! Accounts carry a normalized email (trimmed, lowercased) and an argon2id
//! password hash. Sessions are server-side: the issued token is opaque
//! random material, only its SHA-256 digest is persisted, and expired rows
//! are pruned lazily on validation.

mod password;

use std::fmt;
use std::sync::Arc;

use rand::rngs::OsRng;
use rand::RngCore;
use rusqlite::{params, OptionalExtension};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{CoreError, CoreResult};
use crate::store::{map_db_err, to_i64, StorageError, Store};

const MAX_EMAIL_LEN: usize = 254;
const SESSION_TOKEN_BYTES: usize = 32;

/// Opaque identifier of a user account.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    /// String form, as persisted.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque session token handed to the plumbing layer (cookie value).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Token material to hand back to the client.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// User accounts plus session issuance and validation.
pub struct CredentialStore {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    session_ttl_secs: u64,
}

impl CredentialStore {
    /// Creates a credential store over the shared relational store.
    #[must_use]
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>, session_ttl_secs: u64) -> Self {
        Self {
            store,
            clock,
            session_ttl_secs,
        }
    }

    /// Creates an account for `email`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for a malformed email,
    /// [`CoreError::WeakPassword`] when the password fails the policy, and
    /// [`CoreError::EmailTaken`] when the email uniqueness constraint fires.
    pub fn create_account(
        &self,
        email: &str,
        password: &SecretString,
    ) -> CoreResult<UserId> {
        let email = normalize_email(email);
        validate_email(&email)?;
        password::check_policy(password.expose_secret())?;
        let password_hash = password::hash(password.expose_secret())?;
        let user_id = Uuid::new_v4().to_string();
        let now = to_i64(self.clock.now_unix(), "now")?;
        self.store.with(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, email, password_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![user_id, email, password_hash, now],
            );
            if let Err(err) = inserted {
                return Err(match map_db_err(&err) {
                    StorageError::Constraint(_) => CoreError::EmailTaken,
                    other => CoreError::from(other),
                });
            }
            Ok(())
        })?;
        Ok(UserId(user_id))
    }

    /// Verifies a login.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Unauthorized`] on an unknown email or a wrong
    /// password, without distinguishing the two.
    pub fn authenticate(&self, email: &str, password: &SecretString) -> CoreResult<UserId> {
        let email = normalize_email(email);
        let row: Option<(String, String)> = self.store.with(|conn| {
            conn.query_row(
                "SELECT id, password_hash FROM users WHERE email = ?1",
                params![email],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|err| CoreError::from(map_db_err(&err)))
        })?;
        let Some((user_id, stored_hash)) = row else {
            return Err(CoreError::Unauthorized);
        };
        if !password::verify(password.expose_secret(), &stored_hash) {
            return Err(CoreError::Unauthorized);
        }
        Ok(UserId(user_id))
    }

    /// Issues a fresh opaque session token for `user`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session row cannot be written.
    pub fn issue_session(&self, user: &UserId) -> CoreResult<SessionToken> {
        let mut token_bytes = [0u8; SESSION_TOKEN_BYTES];
        OsRng.fill_bytes(&mut token_bytes);
        let token = hex::encode(token_bytes);
        let now = self.clock.now_unix();
        let now_i64 = to_i64(now, "now")?;
        let expires_at = to_i64(now.saturating_add(self.session_ttl_secs), "expires_at")?;
        let digest = token_digest(&token);
        self.store.with(|conn| {
            conn.execute(
                "INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![digest, user.as_str(), now_i64, expires_at],
            )
            .map_err(|err| CoreError::from(map_db_err(&err)))
        })?;
        Ok(SessionToken(token))
    }

    /// Resolves a presented token to its user, if the session is live.
    ///
    /// Unknown and expired tokens both resolve to `None`; expired rows are
    /// pruned on the way.
    ///
    /// # Errors
    ///
    /// Returns an error only on store failure.
    pub fn session_from_token(&self, token: &str) -> CoreResult<Option<UserId>> {
        let now = to_i64(self.clock.now_unix(), "now")?;
        let digest = token_digest(token);
        self.store.with(|conn| {
            conn.execute(
                "DELETE FROM sessions WHERE expires_at <= ?1",
                params![now],
            )
            .map_err(|err| CoreError::from(map_db_err(&err)))?;
            conn.query_row(
                "SELECT user_id FROM sessions
                 WHERE token_hash = ?1 AND expires_at > ?2",
                params![digest, now],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|err| CoreError::from(map_db_err(&err)))
            .map(|found| found.map(UserId))
        })
    }

    /// Revokes a session token (logout). Revoking an unknown token is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns an error only on store failure.
    pub fn revoke_session(&self, token: &str) -> CoreResult<()> {
        let digest = token_digest(token);
        self.store.with(|conn| {
            conn.execute(
                "DELETE FROM sessions WHERE token_hash = ?1",
                params![digest],
            )
            .map_err(|err| CoreError::from(map_db_err(&err)))?;
            Ok(())
        })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> CoreResult<()> {
    let invalid = || CoreError::Validation("invalid email format".to_string());
    if email.is_empty() {
        return Err(CoreError::Validation("email is required".to_string()));
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(CoreError::Validation("email is too long".to_string()));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err(invalid());
    };
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    // The domain needs a dot with label characters on both sides.
    let Some((head, tail)) = domain.rsplit_once('.') else {
        return Err(invalid());
    };
    if head.is_empty() || tail.is_empty() {
        return Err(invalid());
    }
    Ok(())
}

fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_support::ManualClock;

    fn credential_store(clock: Arc<ManualClock>) -> CredentialStore {
        let store = Arc::new(Store::in_memory().expect("open store"));
        CredentialStore::new(store, clock, 60 * 60 * 24 * 7)
    }

    fn secret(raw: &str) -> SecretString {
        SecretString::from(raw.to_string())
    }

    #[test]
    fn test_signup_login_session_roundtrip() {
        let clock = Arc::new(ManualClock::at(1_000));
        let accounts = credential_store(Arc::clone(&clock));
        let user = accounts
            .create_account(" Holder@Example.COM ", &secret("Sunny-day-42"))
            .expect("create account");
        let authed = accounts
            .authenticate("holder@example.com", &secret("Sunny-day-42"))
            .expect("authenticate");
        assert_eq!(authed, user);

        let token = accounts.issue_session(&user).expect("issue session");
        let resolved = accounts
            .session_from_token(token.as_str())
            .expect("resolve session");
        assert_eq!(resolved, Some(user));
    }

    #[test]
    fn test_duplicate_email_is_conflict() {
        let clock = Arc::new(ManualClock::at(1_000));
        let accounts = credential_store(clock);
        accounts
            .create_account("holder@example.com", &secret("Sunny-day-42"))
            .expect("create account");
        let err = accounts
            .create_account("HOLDER@example.com", &secret("Other-pass-9"))
            .expect_err("duplicate email");
        match err {
            CoreError::EmailTaken => {}
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_email_rejected() {
        let clock = Arc::new(ManualClock::at(1_000));
        let accounts = credential_store(clock);
        for email in ["", "no-at-sign", "a@b", "a@.com", "two words@example.com"] {
            let err = accounts
                .create_account(email, &secret("Sunny-day-42"))
                .expect_err("malformed email");
            match err {
                CoreError::Validation(_) => {}
                other => panic!("unexpected error for {email:?}: {other}"),
            }
        }
    }

    #[test]
    fn test_weak_password_rejected() {
        let clock = Arc::new(ManualClock::at(1_000));
        let accounts = credential_store(clock);
        let err = accounts
            .create_account("holder@example.com", &secret("short"))
            .expect_err("weak password");
        match err {
            CoreError::WeakPassword(_) => {}
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_login_is_unauthorized() {
        let clock = Arc::new(ManualClock::at(1_000));
        let accounts = credential_store(clock);
        accounts
            .create_account("holder@example.com", &secret("Sunny-day-42"))
            .expect("create account");
        let wrong_password = accounts
            .authenticate("holder@example.com", &secret("Wrong-pass-1"))
            .expect_err("wrong password");
        let unknown_email = accounts
            .authenticate("nobody@example.com", &secret("Sunny-day-42"))
            .expect_err("unknown email");
        for err in [wrong_password, unknown_email] {
            match err {
                CoreError::Unauthorized => {}
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_session_expiry_and_revocation() {
        let clock = Arc::new(ManualClock::at(1_000));
        let accounts = credential_store(Arc::clone(&clock));
        let user = accounts
            .create_account("holder@example.com", &secret("Sunny-day-42"))
            .expect("create account");

        let expiring = accounts.issue_session(&user).expect("issue session");
        clock.advance(60 * 60 * 24 * 7 + 1);
        let resolved = accounts
            .session_from_token(expiring.as_str())
            .expect("resolve expired");
        assert_eq!(resolved, None);

        let revoked = accounts.issue_session(&user).expect("issue session");
        accounts
            .revoke_session(revoked.as_str())
            .expect("revoke session");
        let resolved = accounts
            .session_from_token(revoked.as_str())
            .expect("resolve revoked");
        assert_eq!(resolved, None);
    }

    #[test]
    fn test_unknown_token_resolves_to_none() {
        let clock = Arc::new(ManualClock::at(1_000));
        let accounts = credential_store(clock);
        let resolved = accounts
            .session_from_token("deadbeef")
            .expect("resolve unknown");
        assert_eq!(resolved, None);
    }
}
