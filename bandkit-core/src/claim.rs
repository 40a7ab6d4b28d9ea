//! Band claim protocol.
//!
//! Claiming binds a provisioned identifier to exactly one account, exactly
//! once, under concurrent and adversarial callers. The identifier walks
//! `PROVISIONED (unclaimed) → CLAIMED → PROVISIONED (unclaimed)` (the last
//! edge is unlinking, which leaves the secret unchanged).
//!
//! There is deliberately no "is it already claimed?" read before the write:
//! the uniqueness constraint on `bands.band_id` is the authoritative race
//! tiebreak. Two callers racing through validation cannot both insert; the
//! loser's constraint violation surfaces as [`CoreError::AlreadyClaimed`].

use std::sync::Arc;

use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::accounts::UserId;
use crate::clock::Clock;
use crate::error::{CoreError, CoreResult};
use crate::identifier::BandId;
use crate::store::{map_db_err, to_i64, StorageError, Store};

/// Executes claim requests against the provisioning registry.
pub struct ClaimProtocol {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
}

impl ClaimProtocol {
    /// Creates the claim protocol over the shared store.
    #[must_use]
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Claims `identifier` for `user`, creating the band and its empty
    /// profile in one atomic step.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnrecognizedToken`] for an unprovisioned
    /// identifier, [`CoreError::SecretMismatch`] when the presented secret
    /// differs from the stored one, and [`CoreError::AlreadyClaimed`] when
    /// an active band exists — including the case where a concurrent
    /// claimant won the race after this caller's validation passed.
    pub fn claim(
        &self,
        identifier: &str,
        presented_secret: &str,
        user: &UserId,
    ) -> CoreResult<BandId> {
        let band_id = BandId::parse(identifier)?;
        let now = to_i64(self.clock.now_unix(), "now")?;
        let claimed = self.store.with_tx(|tx| {
            let stored_secret: Option<String> = tx
                .query_row(
                    "SELECT secret FROM provisioned_bands WHERE band_id = ?1",
                    params![band_id.as_str()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|err| CoreError::from(map_db_err(&err)))?;
            let Some(stored_secret) = stored_secret else {
                return Err(CoreError::UnrecognizedToken);
            };
            if stored_secret != presented_secret {
                return Err(CoreError::SecretMismatch);
            }

            let inserted = tx.execute(
                "INSERT INTO bands (id, band_id, user_id, status, created_at)
                 VALUES (?1, ?2, ?3, 'active', ?4)",
                params![
                    Uuid::new_v4().to_string(),
                    band_id.as_str(),
                    user.as_str(),
                    now
                ],
            );
            if let Err(err) = inserted {
                return Err(match map_db_err(&err) {
                    StorageError::Constraint(_) => CoreError::AlreadyClaimed,
                    other => CoreError::from(other),
                });
            }

            // Profile defaults are written explicitly; visibility is part of
            // the record from the first instant, not an absent flag.
            tx.execute(
                "INSERT INTO profiles (
                    id, band_id,
                    full_name, emergency_contact, city_country,
                    blood_group, emergency_note,
                    full_name_public, emergency_contact_public,
                    city_country_public, blood_group_public,
                    emergency_note_public,
                    pdf_data, pdf_filename, pdf_public,
                    updated_at
                 ) VALUES (?1, ?2, '', '', '', 'O+', '', 1, 1, 0, 1, 1,
                           NULL, NULL, 0, ?3)",
                params![Uuid::new_v4().to_string(), band_id.as_str(), now],
            )
            .map_err(|err| CoreError::from(map_db_err(&err)))?;
            Ok(band_id.clone())
        })?;
        tracing::debug!(band_id = %claimed, user = %user, "band claimed");
        Ok(claimed)
    }
}
