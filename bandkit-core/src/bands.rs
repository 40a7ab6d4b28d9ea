//! Band lifecycle: listing owned bands, status lookup, and unlinking.
//!
//! Unlinking deletes the band row and its profile but never touches the
//! provisioning registry, so the identifier becomes claimable again with
//! its original secret.

use std::str::FromStr;
use std::sync::Arc;

use rusqlite::{params, OptionalExtension};
use strum::{AsRefStr, Display, EnumString};

use crate::accounts::UserId;
use crate::error::{CoreError, CoreResult};
use crate::identifier::BandId;
use crate::store::{map_db_err, to_u64, Store};

/// Lifecycle state of a claimed band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum BandStatus {
    /// Claimed and serving its profile.
    Active,
}

/// One owned band as listed on the owner's dashboard.
#[derive(Debug, Clone)]
pub struct BandSummary {
    /// The band's identifier.
    pub band_id: BandId,
    /// Lifecycle state.
    pub status: BandStatus,
    /// Stored name, possibly empty.
    pub full_name: String,
    /// Stored emergency contact, possibly empty.
    pub emergency_contact: String,
    /// Stored location, possibly empty.
    pub city_country: String,
    /// Stored blood group.
    pub blood_group: String,
    /// Unix timestamp of the profile's last write.
    pub updated_at: u64,
}

/// Owner-facing lifecycle operations over claimed bands.
pub struct BandLifecycle {
    store: Arc<Store>,
}

impl BandLifecycle {
    /// Creates the lifecycle manager over the shared store.
    #[must_use]
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Lists every band owned by `user`, ordered by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error only on store failure.
    pub fn list_owned(&self, user: &UserId) -> CoreResult<Vec<BandSummary>> {
        self.store.with(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT b.band_id, b.status,
                            p.full_name, p.emergency_contact, p.city_country,
                            p.blood_group, p.updated_at
                     FROM bands b
                     JOIN profiles p ON p.band_id = b.band_id
                     WHERE b.user_id = ?1
                     ORDER BY b.band_id",
                )
                .map_err(|err| CoreError::from(map_db_err(&err)))?;
            let rows = stmt
                .query_map(params![user.as_str()], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, i64>(6)?,
                    ))
                })
                .map_err(|err| CoreError::from(map_db_err(&err)))?;
            let mut bands = Vec::new();
            for row in rows {
                let (band_id, status, full_name, emergency_contact, city_country, blood_group, updated_at) =
                    row.map_err(|err| CoreError::from(map_db_err(&err)))?;
                bands.push(BandSummary {
                    band_id: BandId::parse(&band_id)?,
                    status: parse_status(&status)?,
                    full_name,
                    emergency_contact,
                    city_country,
                    blood_group,
                    updated_at: to_u64(updated_at, "updated_at")?,
                });
            }
            Ok(bands)
        })
    }

    /// Returns the lifecycle state of a claimed band.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] when the identifier has no claimed
    /// band, provisioned or not.
    pub fn status(&self, identifier: &str) -> CoreResult<BandStatus> {
        let band_id = BandId::parse(identifier)?;
        let status: Option<String> = self.store.with(|conn| {
            conn.query_row(
                "SELECT status FROM bands WHERE band_id = ?1",
                params![band_id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| CoreError::from(map_db_err(&err)))
        })?;
        match status {
            Some(raw) => parse_status(&raw),
            None => Err(CoreError::NotFound),
        }
    }

    /// Unlinks a band from its owner, deleting the profile with it.
    ///
    /// The provisioned identifier+secret pair stays in the registry, so
    /// the same band can be claimed again afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] when the band does not exist and
    /// [`CoreError::Forbidden`] when `user` is not its owner.
    pub fn unlink(&self, identifier: &str, user: &UserId) -> CoreResult<()> {
        let band_id = BandId::parse(identifier)?;
        self.store.with_tx(|tx| {
            let owner: Option<String> = tx
                .query_row(
                    "SELECT user_id FROM bands WHERE band_id = ?1",
                    params![band_id.as_str()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|err| CoreError::from(map_db_err(&err)))?;
            match owner {
                None => return Err(CoreError::NotFound),
                Some(owner) if owner != user.as_str() => return Err(CoreError::Forbidden),
                Some(_) => {}
            }
            tx.execute(
                "DELETE FROM profiles WHERE band_id = ?1",
                params![band_id.as_str()],
            )
            .map_err(|err| CoreError::from(map_db_err(&err)))?;
            tx.execute(
                "DELETE FROM bands WHERE band_id = ?1",
                params![band_id.as_str()],
            )
            .map_err(|err| CoreError::from(map_db_err(&err)))?;
            Ok(())
        })?;
        tracing::info!(band_id = %band_id, "band unlinked");
        Ok(())
    }
}

fn parse_status(raw: &str) -> CoreResult<BandStatus> {
    BandStatus::from_str(raw)
        .map_err(|_| CoreError::Integrity(format!("unknown band status: {raw:?}")))
}
