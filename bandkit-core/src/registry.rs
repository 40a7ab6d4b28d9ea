//! Provisioning registry: the set of claimable identifier+secret pairs.
//!
//! Provisioning creates capability, claiming consumes it. A provisioned
//! band is never mutated and survives unlinking, so the printed secret
//! stays valid across claim cycles.

use std::sync::Arc;

use rusqlite::params;
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{CoreError, CoreResult};
use crate::identifier::{BandId, BandIdGenerator};
use crate::store::{map_db_err, to_i64, StorageError, Store};

/// How many generated candidates to try before giving up. At four hex
/// characters of entropy per candidate this only trips on a nearly full
/// code space.
const GENERATE_ATTEMPTS: usize = 8;

/// A freshly provisioned identifier+secret pair, as printed onto the band.
#[derive(Debug, Clone)]
pub struct ProvisionedBand {
    /// The human-legible identifier.
    pub band_id: BandId,
    /// The claim secret, encoded into the band's QR payload.
    pub secret: String,
}

/// Admin-gated registry of provisioned bands.
pub struct ProvisioningRegistry {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    admin_key: Option<SecretString>,
    generator: BandIdGenerator,
}

impl ProvisioningRegistry {
    /// Creates a registry over the shared store. While `admin_key` is
    /// `None`, every provisioning call is rejected.
    #[must_use]
    pub fn new(
        store: Arc<Store>,
        clock: Arc<dyn Clock>,
        admin_key: Option<SecretString>,
    ) -> Self {
        Self {
            store,
            clock,
            admin_key,
            generator: BandIdGenerator,
        }
    }

    /// Provisions one band, generating the identifier when omitted.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Forbidden`] on a wrong admin key,
    /// [`CoreError::DuplicateIdentifier`] when a caller-supplied identifier
    /// is already provisioned, and [`CoreError::Validation`] for malformed
    /// identifiers.
    pub fn provision(
        &self,
        admin_key: &SecretString,
        band_id: Option<&str>,
    ) -> CoreResult<ProvisionedBand> {
        self.verify_admin(admin_key)?;
        let secret = Uuid::new_v4().to_string();
        match band_id {
            Some(raw) => {
                let band_id = BandId::parse(raw)?;
                self.insert(&band_id, &secret)
                    .map_err(|err| match err {
                        CoreError::Integrity(_) => CoreError::DuplicateIdentifier,
                        other => other,
                    })?;
                tracing::info!(band_id = %band_id, "provisioned band");
                Ok(ProvisionedBand { band_id, secret })
            }
            None => {
                for _ in 0..GENERATE_ATTEMPTS {
                    let band_id = self.generator.generate();
                    match self.insert(&band_id, &secret) {
                        Ok(()) => {
                            tracing::info!(band_id = %band_id, "provisioned band");
                            return Ok(ProvisionedBand { band_id, secret });
                        }
                        Err(CoreError::Integrity(_)) => {}
                        Err(other) => return Err(other),
                    }
                }
                Err(CoreError::Integrity(
                    "could not allocate an unused band identifier".to_string(),
                ))
            }
        }
    }

    /// Seeds a batch of known identifier+secret pairs, skipping any
    /// identifier that is already provisioned. Used by deployment tooling.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Forbidden`] on a wrong admin key, or a
    /// validation/store error.
    pub fn provision_batch(
        &self,
        admin_key: &SecretString,
        pairs: &[(&str, &str)],
    ) -> CoreResult<()> {
        self.verify_admin(admin_key)?;
        let now = to_i64(self.clock.now_unix(), "now")?;
        self.store.with_tx(|tx| {
            for (raw_id, secret) in pairs {
                let band_id = BandId::parse(raw_id)?;
                tx.execute(
                    "INSERT OR IGNORE INTO provisioned_bands (band_id, secret, created_at)
                     VALUES (?1, ?2, ?3)",
                    params![band_id.as_str(), secret, now],
                )
                .map_err(|err| CoreError::from(map_db_err(&err)))?;
            }
            Ok(())
        })
    }

    fn insert(&self, band_id: &BandId, secret: &str) -> CoreResult<()> {
        let now = to_i64(self.clock.now_unix(), "now")?;
        self.store.with(|conn| {
            let inserted = conn.execute(
                "INSERT INTO provisioned_bands (band_id, secret, created_at)
                 VALUES (?1, ?2, ?3)",
                params![band_id.as_str(), secret, now],
            );
            if let Err(err) = inserted {
                return Err(match map_db_err(&err) {
                    StorageError::Constraint(message) => CoreError::Integrity(message),
                    other => CoreError::from(other),
                });
            }
            Ok(())
        })
    }

    fn verify_admin(&self, presented: &SecretString) -> CoreResult<()> {
        let Some(expected) = &self.admin_key else {
            return Err(CoreError::Forbidden);
        };
        let matches: bool = expected
            .expose_secret()
            .as_bytes()
            .ct_eq(presented.expose_secret().as_bytes())
            .into();
        if matches {
            Ok(())
        } else {
            Err(CoreError::Forbidden)
        }
    }
}
