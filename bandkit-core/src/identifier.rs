//! Band identifier type and generator.

use std::fmt;

use rand::Rng;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// Longest identifier accepted from a caller. Printed codes are short; this
/// only bounds pathological input.
const MAX_IDENTIFIER_LEN: usize = 64;

/// Normalized identifier of one physical band.
///
/// Identifiers are compared and stored in canonical form: surrounding
/// whitespace stripped and ASCII letters uppercased. Every lookup path goes
/// through [`BandId::parse`] so the canonical form is applied consistently.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BandId(String);

impl BandId {
    /// Parses and normalizes a caller-entered identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if the identifier is empty after
    /// trimming or unreasonably long.
    pub fn parse(raw: &str) -> CoreResult<Self> {
        let normalized = raw.trim().to_ascii_uppercase();
        if normalized.is_empty() {
            return Err(CoreError::Validation(
                "band identifier is required".to_string(),
            ));
        }
        if normalized.len() > MAX_IDENTIFIER_LEN {
            return Err(CoreError::Validation(format!(
                "band identifier longer than {MAX_IDENTIFIER_LEN} characters"
            )));
        }
        Ok(Self(normalized))
    }

    /// Canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generator for human-legible band identifiers.
///
/// Produces codes of the form `BND-XXX-YYYY` (three digits, four hex
/// characters). Collisions are possible at this length and are handled by
/// the provisioning registry retrying against the uniqueness constraint.
#[derive(Debug, Default, Clone, Copy)]
pub struct BandIdGenerator;

impl BandIdGenerator {
    /// Generates a fresh candidate identifier.
    #[must_use]
    pub fn generate(&self) -> BandId {
        let digits = rand::thread_rng().gen_range(100..1000);
        let tail = Uuid::new_v4().simple().to_string();
        BandId(format!(
            "BND-{digits}-{}",
            tail[..4].to_ascii_uppercase()
        ))
    }
}
