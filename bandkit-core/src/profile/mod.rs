//! Profile visibility engine.
//!
//! Stores per-field values and per-field public/private flags, and renders
//! either the owner's full view or the redacted public view. Writes are
//! owner-only and partial: unspecified fields keep their stored value.

mod fields;
#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::sync::Arc;

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use strum::IntoEnumIterator;

pub use fields::{
    BloodGroup, Document, DocumentMeta, FieldEntry, OwnerProfile, ProfileField,
    ProfileUpdate, PublicProfile,
};

use crate::accounts::UserId;
use crate::clock::Clock;
use crate::error::{CoreError, CoreResult};
use crate::identifier::BandId;
use crate::store::{map_db_err, to_i64, to_u64, Store};

const MAX_FILENAME_LEN: usize = 255;

/// PDF magic bytes; payloads without this prefix are rejected.
const PDF_MAGIC: &[u8] = b"%PDF";

struct ProfileRow {
    owner: String,
    fields: BTreeMap<ProfileField, FieldEntry>,
    document: Option<DocumentMeta>,
    updated_at: i64,
}

/// Owner/public profile views and owner-only writes.
pub struct ProfileEngine {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    max_document_bytes: usize,
}

impl ProfileEngine {
    /// Creates the engine over the shared store.
    #[must_use]
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>, max_document_bytes: usize) -> Self {
        Self {
            store,
            clock,
            max_document_bytes,
        }
    }

    /// Returns the full, unredacted profile for its owner.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] when no profile exists for the
    /// identifier and [`CoreError::Forbidden`] when `user` is not the owner.
    pub fn owner_view(&self, identifier: &str, user: &UserId) -> CoreResult<OwnerProfile> {
        let band_id = BandId::parse(identifier)?;
        let row = self
            .load_row(&band_id)?
            .ok_or(CoreError::NotFound)?;
        if row.owner != user.as_str() {
            return Err(CoreError::Forbidden);
        }
        Ok(OwnerProfile {
            band_id,
            fields: row.fields,
            document: row.document,
            updated_at: to_u64(row.updated_at, "updated_at")?,
        })
    }

    /// Returns the redacted view served to any finder.
    ///
    /// Identifier and `updated_at` are always present; content fields with
    /// the visibility flag off are omitted entirely, and the document only
    /// appears when its own flag is on.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] when no profile exists.
    pub fn public_view(&self, identifier: &str) -> CoreResult<PublicProfile> {
        let band_id = BandId::parse(identifier)?;
        let row = self
            .load_row(&band_id)?
            .ok_or(CoreError::NotFound)?;
        let fields = row
            .fields
            .into_iter()
            .filter(|(_, entry)| entry.public)
            .map(|(field, entry)| (field, entry.value))
            .collect();
        let document = row.document.filter(|meta| meta.public);
        Ok(PublicProfile {
            band_id,
            fields,
            document,
            updated_at: to_u64(row.updated_at, "updated_at")?,
        })
    }

    /// Applies a partial update to values and visibility flags.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Forbidden`] unless `user` owns the band,
    /// [`CoreError::Validation`] for an empty update or an out-of-enum
    /// blood group. On any error the stored profile is unchanged.
    pub fn update(
        &self,
        identifier: &str,
        user: &UserId,
        update: &ProfileUpdate,
    ) -> CoreResult<()> {
        let band_id = BandId::parse(identifier)?;
        if update.is_empty() {
            return Err(CoreError::Validation("no fields to update".to_string()));
        }
        let mut validated = Vec::with_capacity(update.values.len());
        for (field, raw) in &update.values {
            validated.push((*field, field.normalize_value(raw)?));
        }
        let now = to_i64(self.clock.now_unix(), "now")?;
        self.store.with_tx(|tx| {
            match owner_of(tx, &band_id)? {
                Some(owner) if owner == user.as_str() => {}
                _ => return Err(CoreError::Forbidden),
            }
            let mut assignments = Vec::new();
            let mut values: Vec<Value> = Vec::new();
            for (field, value) in validated {
                values.push(Value::from(value));
                assignments.push(format!("{} = ?{}", field.value_column(), values.len()));
            }
            for (field, public) in &update.visibility {
                values.push(Value::from(i64::from(*public)));
                assignments.push(format!(
                    "{} = ?{}",
                    field.visibility_column(),
                    values.len()
                ));
            }
            values.push(Value::from(now));
            assignments.push(format!("updated_at = ?{}", values.len()));
            values.push(Value::from(band_id.as_str().to_string()));
            let sql = format!(
                "UPDATE profiles SET {} WHERE band_id = ?{}",
                assignments.join(", "),
                values.len()
            );
            tx.execute(&sql, params_from_iter(values))
                .map_err(|err| CoreError::from(map_db_err(&err)))?;
            Ok(())
        })
    }

    /// Attaches a document to the profile, replacing any existing one.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TooLarge`] above the configured byte cap,
    /// [`CoreError::WrongFormat`] unless the payload carries the PDF magic,
    /// [`CoreError::NotFound`]/[`CoreError::Forbidden`] for a missing band
    /// or a non-owner.
    pub fn attach_document(
        &self,
        identifier: &str,
        user: &UserId,
        bytes: Vec<u8>,
        filename: &str,
        public: bool,
    ) -> CoreResult<()> {
        let band_id = BandId::parse(identifier)?;
        let filename = filename.trim();
        if filename.is_empty() || filename.len() > MAX_FILENAME_LEN {
            return Err(CoreError::Validation("invalid document filename".to_string()));
        }
        if bytes.len() > self.max_document_bytes {
            return Err(CoreError::TooLarge {
                size: bytes.len(),
                limit: self.max_document_bytes,
            });
        }
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(CoreError::WrongFormat);
        }
        let now = to_i64(self.clock.now_unix(), "now")?;
        self.store.with_tx(|tx| {
            ensure_owner(tx, &band_id, user)?;
            tx.execute(
                "UPDATE profiles
                 SET pdf_data = ?1, pdf_filename = ?2, pdf_public = ?3,
                     updated_at = ?4
                 WHERE band_id = ?5",
                params![bytes, filename, i64::from(public), now, band_id.as_str()],
            )
            .map_err(|err| CoreError::from(map_db_err(&err)))?;
            Ok(())
        })
    }

    /// Fetches the attached document, enforcing its visibility flag.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] when no profile or no document
    /// exists and [`CoreError::Forbidden`] when the document is private
    /// and `viewer` is not the owner.
    pub fn document(
        &self,
        identifier: &str,
        viewer: Option<&UserId>,
    ) -> CoreResult<Document> {
        let band_id = BandId::parse(identifier)?;
        let row: Option<(String, Option<Vec<u8>>, Option<String>, bool)> =
            self.store.with(|conn| {
                conn.query_row(
                    "SELECT b.user_id, p.pdf_data, p.pdf_filename, p.pdf_public
                     FROM bands b
                     JOIN profiles p ON p.band_id = b.band_id
                     WHERE b.band_id = ?1",
                    params![band_id.as_str()],
                    |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                    },
                )
                .optional()
                .map_err(|err| CoreError::from(map_db_err(&err)))
            })?;
        let Some((owner, data, filename, public)) = row else {
            return Err(CoreError::NotFound);
        };
        let (Some(bytes), Some(filename)) = (data, filename) else {
            return Err(CoreError::NotFound);
        };
        if !public && viewer.map(UserId::as_str) != Some(owner.as_str()) {
            return Err(CoreError::Forbidden);
        }
        Ok(Document { filename, bytes })
    }

    /// Removes the attached document, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`]/[`CoreError::Forbidden`] for a
    /// missing band or a non-owner.
    pub fn remove_document(&self, identifier: &str, user: &UserId) -> CoreResult<()> {
        let band_id = BandId::parse(identifier)?;
        let now = to_i64(self.clock.now_unix(), "now")?;
        self.store.with_tx(|tx| {
            ensure_owner(tx, &band_id, user)?;
            tx.execute(
                "UPDATE profiles
                 SET pdf_data = NULL, pdf_filename = NULL, pdf_public = 0,
                     updated_at = ?1
                 WHERE band_id = ?2",
                params![now, band_id.as_str()],
            )
            .map_err(|err| CoreError::from(map_db_err(&err)))?;
            Ok(())
        })
    }

    fn load_row(&self, band_id: &BandId) -> CoreResult<Option<ProfileRow>> {
        self.store.with(|conn| {
            conn.query_row(
                "SELECT b.user_id,
                        p.full_name, p.emergency_contact, p.city_country,
                        p.blood_group, p.emergency_note,
                        p.full_name_public, p.emergency_contact_public,
                        p.city_country_public, p.blood_group_public,
                        p.emergency_note_public,
                        p.pdf_filename, length(p.pdf_data), p.pdf_public,
                        p.updated_at
                 FROM bands b
                 JOIN profiles p ON p.band_id = b.band_id
                 WHERE b.band_id = ?1",
                params![band_id.as_str()],
                map_profile_row,
            )
            .optional()
            .map_err(|err| CoreError::from(map_db_err(&err)))
        })
    }
}

fn ensure_owner(conn: &Connection, band_id: &BandId, user: &UserId) -> CoreResult<()> {
    match owner_of(conn, band_id)? {
        None => Err(CoreError::NotFound),
        Some(owner) if owner == user.as_str() => Ok(()),
        Some(_) => Err(CoreError::Forbidden),
    }
}

fn owner_of(conn: &Connection, band_id: &BandId) -> CoreResult<Option<String>> {
    conn.query_row(
        "SELECT user_id FROM bands WHERE band_id = ?1",
        params![band_id.as_str()],
        |row| row.get(0),
    )
    .optional()
    .map_err(|err| CoreError::from(map_db_err(&err)))
}

fn map_profile_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProfileRow> {
    let owner: String = row.get(0)?;
    let mut fields = BTreeMap::new();
    for (index, field) in ProfileField::iter().enumerate() {
        let value: String = row.get(1 + index)?;
        let public: bool = row.get(6 + index)?;
        fields.insert(field, FieldEntry { value, public });
    }
    let filename: Option<String> = row.get(11)?;
    let size: Option<i64> = row.get(12)?;
    let public: bool = row.get(13)?;
    let updated_at: i64 = row.get(14)?;
    let document = match (filename, size) {
        (Some(filename), Some(size)) => Some(DocumentMeta {
            filename,
            size: u64::try_from(size).unwrap_or(0),
            public,
        }),
        _ => None,
    };
    Ok(ProfileRow {
        owner,
        fields,
        document,
        updated_at,
    })
}
