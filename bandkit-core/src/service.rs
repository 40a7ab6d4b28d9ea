//! Service façade wiring the core components together.
//!
//! One [`CoreService`] owns the store, the credential store, the
//! provisioning registry, the claim protocol, the profile engine, the band
//! lifecycle, and the rate limiter. Plumbing layers (HTTP handlers, CLI
//! tooling) call it and translate [`CoreError`] values to their own surface.
//!
//! Credential-bearing operations take a `caller` key (typically the remote
//! address) and consume rate-limit budget before touching the store.

use std::path::Path;
use std::sync::Arc;

use secrecy::SecretString;

use crate::accounts::{CredentialStore, SessionToken, UserId};
use crate::bands::{BandLifecycle, BandStatus, BandSummary};
use crate::claim::ClaimProtocol;
use crate::clock::{Clock, SystemClock};
use crate::config::CoreConfig;
use crate::error::CoreResult;
use crate::identifier::BandId;
use crate::profile::{Document, OwnerProfile, ProfileEngine, ProfileUpdate, PublicProfile};
use crate::rate_limit::{RateAction, RateLimiter};
use crate::registry::{ProvisionedBand, ProvisioningRegistry};
use crate::store::Store;

/// The assembled band core.
pub struct CoreService {
    accounts: CredentialStore,
    registry: ProvisioningRegistry,
    claims: ClaimProtocol,
    profiles: ProfileEngine,
    lifecycle: BandLifecycle,
    limiter: RateLimiter,
}

impl CoreService {
    /// Opens (or creates) the database at `path` and assembles the service.
    ///
    /// # Errors
    ///
    /// Returns an error when the database cannot be opened or migrated.
    pub fn open(path: &Path, config: CoreConfig) -> CoreResult<Self> {
        let store = Arc::new(Store::open(path)?);
        Ok(Self::new(store, config, Arc::new(SystemClock)))
    }

    /// Assembles the service over an in-memory database. Used by tests and
    /// throwaway tooling.
    ///
    /// # Errors
    ///
    /// Returns an error when the schema cannot be created.
    pub fn in_memory(config: CoreConfig) -> CoreResult<Self> {
        let store = Arc::new(Store::in_memory()?);
        Ok(Self::new(store, config, Arc::new(SystemClock)))
    }

    /// Assembles the service from its parts. The injected clock drives
    /// session expiry, rate-limit windows, and stored timestamps.
    #[must_use]
    pub fn new(store: Arc<Store>, config: CoreConfig, clock: Arc<dyn Clock>) -> Self {
        let accounts = CredentialStore::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            config.session_ttl_secs,
        );
        let registry = ProvisioningRegistry::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            config.admin_key,
        );
        let claims = ClaimProtocol::new(Arc::clone(&store), Arc::clone(&clock));
        let profiles = ProfileEngine::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            config.max_document_bytes,
        );
        let lifecycle = BandLifecycle::new(store);
        let limiter = RateLimiter::new(config.rate_limits, clock);
        Self {
            accounts,
            registry,
            claims,
            profiles,
            lifecycle,
            limiter,
        }
    }

    /// Creates an account and logs it in.
    ///
    /// # Errors
    ///
    /// Rate-limited per caller; see [`CredentialStore::create_account`].
    pub fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        caller: &str,
    ) -> CoreResult<(UserId, SessionToken)> {
        self.limiter.check(RateAction::SignUp, caller)?;
        let user = self.accounts.create_account(email, password)?;
        let token = self.accounts.issue_session(&user)?;
        tracing::info!(user = %user, "account created");
        Ok((user, token))
    }

    /// Verifies a login and issues a fresh session.
    ///
    /// # Errors
    ///
    /// Rate-limited per caller; see [`CredentialStore::authenticate`].
    pub fn log_in(
        &self,
        email: &str,
        password: &SecretString,
        caller: &str,
    ) -> CoreResult<(UserId, SessionToken)> {
        self.limiter.check(RateAction::LogIn, caller)?;
        let user = self.accounts.authenticate(email, password)?;
        let token = self.accounts.issue_session(&user)?;
        Ok((user, token))
    }

    /// Revokes a session token. Unknown tokens are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error only on store failure.
    pub fn log_out(&self, token: &str) -> CoreResult<()> {
        self.accounts.revoke_session(token)
    }

    /// Resolves a session token to its user, if the session is live.
    ///
    /// # Errors
    ///
    /// Returns an error only on store failure.
    pub fn session_user(&self, token: &str) -> CoreResult<Option<UserId>> {
        self.accounts.session_from_token(token)
    }

    /// Provisions one band; see [`ProvisioningRegistry::provision`].
    ///
    /// # Errors
    ///
    /// Rate-limited per caller; `Forbidden` on a wrong or unset admin key.
    pub fn provision_band(
        &self,
        admin_key: &SecretString,
        band_id: Option<&str>,
        caller: &str,
    ) -> CoreResult<ProvisionedBand> {
        self.limiter.check(RateAction::Provision, caller)?;
        self.registry.provision(admin_key, band_id)
    }

    /// Seeds known identifier+secret pairs; see
    /// [`ProvisioningRegistry::provision_batch`].
    ///
    /// # Errors
    ///
    /// `Forbidden` on a wrong or unset admin key.
    pub fn seed_bands(
        &self,
        admin_key: &SecretString,
        pairs: &[(&str, &str)],
    ) -> CoreResult<()> {
        self.registry.provision_batch(admin_key, pairs)
    }

    /// Claims a provisioned band for `user`; see [`ClaimProtocol::claim`].
    ///
    /// # Errors
    ///
    /// Rate-limited per caller; see [`ClaimProtocol::claim`] for the claim
    /// outcomes.
    pub fn claim_band(
        &self,
        identifier: &str,
        secret: &str,
        user: &UserId,
        caller: &str,
    ) -> CoreResult<BandId> {
        self.limiter.check(RateAction::Claim, caller)?;
        self.claims.claim(identifier, secret, user)
    }

    /// The redacted profile view served to any finder.
    ///
    /// # Errors
    ///
    /// See [`ProfileEngine::public_view`].
    pub fn public_profile(&self, identifier: &str) -> CoreResult<PublicProfile> {
        self.profiles.public_view(identifier)
    }

    /// The owner's full profile view.
    ///
    /// # Errors
    ///
    /// See [`ProfileEngine::owner_view`].
    pub fn owner_profile(&self, identifier: &str, user: &UserId) -> CoreResult<OwnerProfile> {
        self.profiles.owner_view(identifier, user)
    }

    /// Applies a partial profile update.
    ///
    /// # Errors
    ///
    /// See [`ProfileEngine::update`].
    pub fn update_profile(
        &self,
        identifier: &str,
        user: &UserId,
        update: &ProfileUpdate,
    ) -> CoreResult<()> {
        self.profiles.update(identifier, user, update)
    }

    /// Lists the caller's bands.
    ///
    /// # Errors
    ///
    /// Returns an error only on store failure.
    pub fn list_bands(&self, user: &UserId) -> CoreResult<Vec<BandSummary>> {
        self.lifecycle.list_owned(user)
    }

    /// Unlinks a band; see [`BandLifecycle::unlink`].
    ///
    /// # Errors
    ///
    /// See [`BandLifecycle::unlink`].
    pub fn unlink_band(&self, identifier: &str, user: &UserId) -> CoreResult<()> {
        self.lifecycle.unlink(identifier, user)
    }

    /// Lifecycle state of a claimed band.
    ///
    /// # Errors
    ///
    /// See [`BandLifecycle::status`].
    pub fn band_status(&self, identifier: &str) -> CoreResult<BandStatus> {
        self.lifecycle.status(identifier)
    }

    /// Attaches a document; see [`ProfileEngine::attach_document`].
    ///
    /// # Errors
    ///
    /// See [`ProfileEngine::attach_document`].
    pub fn attach_document(
        &self,
        identifier: &str,
        user: &UserId,
        bytes: Vec<u8>,
        filename: &str,
        public: bool,
    ) -> CoreResult<()> {
        self.profiles
            .attach_document(identifier, user, bytes, filename, public)
    }

    /// Fetches the attached document; see [`ProfileEngine::document`].
    ///
    /// # Errors
    ///
    /// See [`ProfileEngine::document`].
    pub fn document(&self, identifier: &str, viewer: Option<&UserId>) -> CoreResult<Document> {
        self.profiles.document(identifier, viewer)
    }

    /// Removes the attached document; see [`ProfileEngine::remove_document`].
    ///
    /// # Errors
    ///
    /// See [`ProfileEngine::remove_document`].
    pub fn remove_document(&self, identifier: &str, user: &UserId) -> CoreResult<()> {
        self.profiles.remove_document(identifier, user)
    }

    /// Sweeps expired rate-limit windows. Safe to call periodically.
    pub fn prune_rate_limits(&self) {
        self.limiter.prune();
    }
}
