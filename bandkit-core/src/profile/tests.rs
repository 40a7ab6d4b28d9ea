use std::sync::Arc;

use secrecy::SecretString;

use super::*;
use crate::accounts::CredentialStore;
use crate::claim::ClaimProtocol;
use crate::clock::test_support::ManualClock;
use crate::registry::ProvisioningRegistry;

const MAX_DOC_BYTES: usize = 1024;

struct Fixture {
    clock: Arc<ManualClock>,
    engine: ProfileEngine,
    owner: UserId,
    other: UserId,
}

fn fixture() -> Fixture {
    let store = Arc::new(Store::in_memory().expect("open store"));
    let clock = Arc::new(ManualClock::at(1_000));
    let admin_key = SecretString::from("admin".to_string());
    let registry = ProvisioningRegistry::new(
        Arc::clone(&store),
        Arc::clone(&clock) as _,
        Some(SecretString::from("admin".to_string())),
    );
    let band = registry
        .provision(&admin_key, Some("BND-777"))
        .expect("provision");
    let accounts = CredentialStore::new(Arc::clone(&store), Arc::clone(&clock) as _, 3600);
    let owner = accounts
        .create_account("owner@example.com", &SecretString::from("Sunny-day-42".to_string()))
        .expect("create owner");
    let other = accounts
        .create_account("other@example.com", &SecretString::from("Sunny-day-42".to_string()))
        .expect("create other");
    let claims = ClaimProtocol::new(Arc::clone(&store), Arc::clone(&clock) as _);
    claims
        .claim("BND-777", &band.secret, &owner)
        .expect("claim");
    let engine = ProfileEngine::new(store, clock.clone() as _, MAX_DOC_BYTES);
    Fixture {
        clock,
        engine,
        owner,
        other,
    }
}

#[test]
fn test_fresh_profile_has_explicit_defaults() {
    let fx = fixture();
    let view = fx.engine.owner_view("BND-777", &fx.owner).expect("owner view");
    for (field, entry) in &view.fields {
        let expected_value = if *field == ProfileField::BloodGroup { "O+" } else { "" };
        assert_eq!(entry.value, expected_value, "{field}");
        let expected_public = *field != ProfileField::CityCountry;
        assert_eq!(entry.public, expected_public, "{field}");
    }
    assert!(view.document.is_none());
    assert_eq!(view.updated_at, 1_000);
}

#[test]
fn test_update_and_redaction() {
    let fx = fixture();
    let update = ProfileUpdate::default()
        .value(ProfileField::FullName, "  Ana Costa  ")
        .value(ProfileField::EmergencyNote, "Allergic to penicillin")
        .value(ProfileField::BloodGroup, "AB-")
        .visibility(ProfileField::EmergencyNote, false);
    fx.engine
        .update("bnd-777", &fx.owner, &update)
        .expect("update");

    let owner_view = fx
        .engine
        .owner_view("BND-777", &fx.owner)
        .expect("owner view");
    assert_eq!(owner_view.fields[&ProfileField::FullName].value, "Ana Costa");
    assert_eq!(owner_view.fields[&ProfileField::BloodGroup].value, "AB-");
    assert!(!owner_view.fields[&ProfileField::EmergencyNote].public);

    let public_view = fx.engine.public_view("BND-777").expect("public view");
    assert_eq!(
        public_view.fields.get(&ProfileField::FullName).map(String::as_str),
        Some("Ana Costa")
    );
    // Hidden and private-by-default fields are absent, not empty.
    assert!(!public_view.fields.contains_key(&ProfileField::EmergencyNote));
    assert!(!public_view.fields.contains_key(&ProfileField::CityCountry));
    assert_eq!(public_view.band_id.as_str(), "BND-777");
}

#[test]
fn test_invalid_blood_group_leaves_profile_unchanged() {
    let fx = fixture();
    let update = ProfileUpdate::default()
        .value(ProfileField::FullName, "Ana")
        .value(ProfileField::BloodGroup, "Z+");
    let err = fx
        .engine
        .update("BND-777", &fx.owner, &update)
        .expect_err("invalid blood group");
    match err {
        CoreError::Validation(_) => {}
        other => panic!("unexpected error: {other}"),
    }
    let view = fx.engine.owner_view("BND-777", &fx.owner).expect("owner view");
    assert_eq!(view.fields[&ProfileField::FullName].value, "");
    assert_eq!(view.fields[&ProfileField::BloodGroup].value, "O+");
}

#[test]
fn test_empty_update_is_rejected() {
    let fx = fixture();
    let err = fx
        .engine
        .update("BND-777", &fx.owner, &ProfileUpdate::default())
        .expect_err("empty update");
    match err {
        CoreError::Validation(_) => {}
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_non_owner_cannot_write_or_read_owner_view() {
    let fx = fixture();
    let update = ProfileUpdate::default().value(ProfileField::FullName, "Mallory");
    let write = fx
        .engine
        .update("BND-777", &fx.other, &update)
        .expect_err("non-owner write");
    let read = fx
        .engine
        .owner_view("BND-777", &fx.other)
        .expect_err("non-owner owner view");
    for err in [write, read] {
        match err {
            CoreError::Forbidden => {}
            other => panic!("unexpected error: {other}"),
        }
    }
}

#[test]
fn test_unknown_band_is_not_found() {
    let fx = fixture();
    let err = fx.engine.public_view("BND-000").expect_err("unknown band");
    match err {
        CoreError::NotFound => {}
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_update_bumps_updated_at() {
    let fx = fixture();
    fx.clock.advance(50);
    let update = ProfileUpdate::default().visibility(ProfileField::FullName, false);
    fx.engine
        .update("BND-777", &fx.owner, &update)
        .expect("update");
    let view = fx.engine.owner_view("BND-777", &fx.owner).expect("owner view");
    assert_eq!(view.updated_at, 1_050);
    assert!(!view.fields[&ProfileField::FullName].public);
}

#[test]
fn test_document_size_and_format_gates() {
    let fx = fixture();
    let oversized = vec![b'%'; MAX_DOC_BYTES + 1];
    let err = fx
        .engine
        .attach_document("BND-777", &fx.owner, oversized, "doc.pdf", true)
        .expect_err("oversized");
    match err {
        CoreError::TooLarge { size, limit } => {
            assert_eq!(size, MAX_DOC_BYTES + 1);
            assert_eq!(limit, MAX_DOC_BYTES);
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = fx
        .engine
        .attach_document("BND-777", &fx.owner, b"PK\x03\x04junk".to_vec(), "doc.pdf", true)
        .expect_err("not a pdf");
    match err {
        CoreError::WrongFormat => {}
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_document_visibility_and_removal() {
    let fx = fixture();
    let payload = b"%PDF-1.7 minimal".to_vec();
    fx.engine
        .attach_document("BND-777", &fx.owner, payload.clone(), " card.pdf ", false)
        .expect("attach");

    let meta = fx
        .engine
        .owner_view("BND-777", &fx.owner)
        .expect("owner view")
        .document
        .expect("document meta");
    assert_eq!(meta.filename, "card.pdf");
    assert_eq!(meta.size, payload.len() as u64);
    assert!(!meta.public);

    // Private document: owner only.
    let doc = fx
        .engine
        .document("BND-777", Some(&fx.owner))
        .expect("owner fetch");
    assert_eq!(doc.bytes, payload);
    for viewer in [None, Some(&fx.other)] {
        let err = fx
            .engine
            .document("BND-777", viewer)
            .expect_err("private document");
        match err {
            CoreError::Forbidden => {}
            other => panic!("unexpected error: {other}"),
        }
    }
    assert!(
        fx.engine
            .public_view("BND-777")
            .expect("public view")
            .document
            .is_none()
    );

    // Flip to public via a fresh attach.
    fx.engine
        .attach_document("BND-777", &fx.owner, payload.clone(), "card.pdf", true)
        .expect("attach public");
    fx.engine
        .document("BND-777", None)
        .expect("anonymous fetch of public document");

    fx.engine
        .remove_document("BND-777", &fx.owner)
        .expect("remove");
    let err = fx
        .engine
        .document("BND-777", Some(&fx.owner))
        .expect_err("removed document");
    match err {
        CoreError::NotFound => {}
        other => panic!("unexpected error: {other}"),
    }
}
