//! Core configuration.

use secrecy::SecretString;
use serde::Deserialize;

use crate::rate_limit::RateAction;

/// Seven days, the session cookie lifetime.
const DEFAULT_SESSION_TTL_SECS: u64 = 60 * 60 * 24 * 7;

/// 2 MiB cap on the decoded document payload.
const DEFAULT_MAX_DOCUMENT_BYTES: usize = 2 * 1024 * 1024;

/// Configuration for the band core, injected at construction.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Lifetime of issued session tokens, in seconds.
    pub session_ttl_secs: u64,
    /// Maximum decoded size of an attached document, in bytes.
    pub max_document_bytes: usize,
    /// Shared key gating the provisioning operation. Provisioning is
    /// rejected with `Forbidden` while unset.
    pub admin_key: Option<SecretString>,
    /// Attempt budgets for credential-bearing operations.
    pub rate_limits: RateLimitConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            admin_key: None,
            rate_limits: RateLimitConfig::default(),
        }
    }
}

/// Sliding-window budgets per action, keyed by caller.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Window length in seconds shared by all actions.
    pub window_secs: u64,
    /// Sign-up attempts per window.
    pub sign_up_attempts: u32,
    /// Log-in attempts per window.
    pub log_in_attempts: u32,
    /// Claim attempts per window.
    pub claim_attempts: u32,
    /// Provisioning attempts per window.
    pub provision_attempts: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            sign_up_attempts: 5,
            log_in_attempts: 10,
            claim_attempts: 5,
            provision_attempts: 3,
        }
    }
}

impl RateLimitConfig {
    pub(crate) const fn attempts_for(&self, action: RateAction) -> u32 {
        match action {
            RateAction::SignUp => self.sign_up_attempts,
            RateAction::LogIn => self.log_in_attempts,
            RateAction::Claim => self.claim_attempts,
            RateAction::Provision => self.provision_attempts,
        }
    }
}
