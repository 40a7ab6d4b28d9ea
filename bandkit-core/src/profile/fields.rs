//! Profile field model: per-field values with independent visibility.
//!
//! Every content field is a (value, visibility) pair. Modeling the field
//! set as an enum keyed map keeps the redaction rule in one place instead
//! of scattered parallel booleans.

use std::collections::BTreeMap;
use std::str::FromStr;

use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::error::{CoreError, CoreResult};
use crate::identifier::BandId;

/// Content fields of a band profile.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    AsRefStr, Display, EnumIter, EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum ProfileField {
    /// The wearer's name.
    FullName,
    /// Phone number or similar contact line for emergencies.
    EmergencyContact,
    /// Coarse location, e.g. "Lisbon, Portugal".
    CityCountry,
    /// Blood group, restricted to [`BloodGroup`].
    BloodGroup,
    /// Free-text note (allergies, conditions, instructions).
    EmergencyNote,
}

impl ProfileField {
    pub(crate) const fn value_column(self) -> &'static str {
        match self {
            Self::FullName => "full_name",
            Self::EmergencyContact => "emergency_contact",
            Self::CityCountry => "city_country",
            Self::BloodGroup => "blood_group",
            Self::EmergencyNote => "emergency_note",
        }
    }

    pub(crate) const fn visibility_column(self) -> &'static str {
        match self {
            Self::FullName => "full_name_public",
            Self::EmergencyContact => "emergency_contact_public",
            Self::CityCountry => "city_country_public",
            Self::BloodGroup => "blood_group_public",
            Self::EmergencyNote => "emergency_note_public",
        }
    }

    /// Per-field cap on stored text, in characters.
    pub(crate) const fn max_len(self) -> usize {
        match self {
            Self::FullName | Self::CityCountry => 100,
            Self::EmergencyContact => 30,
            Self::BloodGroup => 3,
            Self::EmergencyNote => 500,
        }
    }

    /// Normalizes and validates a caller-supplied value for this field.
    ///
    /// Text fields are trimmed and capped at [`ProfileField::max_len`]
    /// characters; the blood group must parse as a [`BloodGroup`].
    pub(crate) fn normalize_value(self, raw: &str) -> CoreResult<String> {
        let trimmed = raw.trim();
        if self == Self::BloodGroup {
            let group = BloodGroup::from_str(trimmed).map_err(|_| {
                CoreError::Validation(format!("invalid blood group: {trimmed:?}"))
            })?;
            return Ok(group.as_ref().to_string());
        }
        Ok(trimmed.chars().take(self.max_len()).collect())
    }
}

/// The eight recognized blood groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumIter, EnumString)]
#[allow(missing_docs)]
pub enum BloodGroup {
    #[strum(serialize = "O+")]
    OPositive,
    #[strum(serialize = "O-")]
    ONegative,
    #[strum(serialize = "A+")]
    APositive,
    #[strum(serialize = "A-")]
    ANegative,
    #[strum(serialize = "B+")]
    BPositive,
    #[strum(serialize = "B-")]
    BNegative,
    #[strum(serialize = "AB+")]
    AbPositive,
    #[strum(serialize = "AB-")]
    AbNegative,
}

/// Partial profile update: unspecified fields are left unchanged.
#[derive(Debug, Default, Clone)]
pub struct ProfileUpdate {
    /// New field values, keyed by field.
    pub values: BTreeMap<ProfileField, String>,
    /// New visibility flags, keyed by field.
    pub visibility: BTreeMap<ProfileField, bool>,
}

impl ProfileUpdate {
    /// Sets a field value.
    #[must_use]
    pub fn value(mut self, field: ProfileField, value: impl Into<String>) -> Self {
        self.values.insert(field, value.into());
        self
    }

    /// Sets a field's visibility flag.
    #[must_use]
    pub fn visibility(mut self, field: ProfileField, public: bool) -> Self {
        self.visibility.insert(field, public);
        self
    }

    /// True when the update carries no changes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.visibility.is_empty()
    }
}

/// One content field as the owner sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEntry {
    /// Stored value (may be empty).
    pub value: String,
    /// Whether the field appears in the public view.
    pub public: bool,
}

/// Metadata of an attached document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMeta {
    /// Filename as uploaded.
    pub filename: String,
    /// Decoded payload size in bytes.
    pub size: u64,
    /// Whether finders may download the document.
    pub public: bool,
}

/// An attached document with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Filename as uploaded.
    pub filename: String,
    /// Raw document bytes.
    pub bytes: Vec<u8>,
}

/// The owner's unredacted view of a profile.
#[derive(Debug, Clone)]
pub struct OwnerProfile {
    /// The band this profile belongs to.
    pub band_id: BandId,
    /// Every content field with its visibility flag.
    pub fields: BTreeMap<ProfileField, FieldEntry>,
    /// Attached document metadata, if any.
    pub document: Option<DocumentMeta>,
    /// Unix timestamp of the last successful write.
    pub updated_at: u64,
}

/// The redacted view served to finders.
///
/// Fields whose visibility flag is off are absent from `fields` entirely:
/// omission signals "the owner chose not to share", which is distinct from
/// an empty value.
#[derive(Debug, Clone)]
pub struct PublicProfile {
    /// The band this profile belongs to.
    pub band_id: BandId,
    /// Only the fields the owner marked public.
    pub fields: BTreeMap<ProfileField, String>,
    /// Document metadata when the owner made the document public.
    pub document: Option<DocumentMeta>,
    /// Unix timestamp of the last successful write.
    pub updated_at: u64,
}
