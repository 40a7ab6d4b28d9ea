//! Rate-limit behavior across the service surface.

mod common;

use bandkit_core::CoreError;
use secrecy::SecretString;

use common::{admin_key, password, service_at, sign_up};

fn assert_rate_limited(err: CoreError) {
    match err {
        CoreError::RateLimited { retry_after_secs } => {
            assert!(retry_after_secs > 0);
            assert!(retry_after_secs <= 60);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_claim_attempts_are_budgeted_per_caller() {
    let (service, clock) = service_at(1_000);
    let band = service
        .provision_band(&admin_key(), Some("BND-777"), "admin-host")
        .expect("provision");
    let (user, _) = sign_up(&service, "holder@example.com");

    // Five guesses burn the budget; validity of the secret is irrelevant.
    for _ in 0..5 {
        let err = service
            .claim_band("BND-777", "not-the-secret", &user, "10.0.0.1")
            .expect_err("wrong secret");
        match err {
            CoreError::SecretMismatch => {}
            other => panic!("unexpected error: {other}"),
        }
    }
    let err = service
        .claim_band("BND-777", &band.secret, &user, "10.0.0.1")
        .expect_err("budget exhausted");
    assert_rate_limited(err);

    // A different caller still gets through.
    service
        .claim_band("BND-777", &band.secret, &user, "10.0.0.2")
        .expect("other caller unaffected");

    // And the first caller recovers once the window elapses.
    clock.advance(61);
    let err = service
        .claim_band("BND-777", &band.secret, &user, "10.0.0.1")
        .expect_err("band gone by now");
    match err {
        CoreError::AlreadyClaimed => {}
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_budgets_are_per_action() {
    let (service, _clock) = service_at(1_000);
    sign_up(&service, "holder@example.com");

    for _ in 0..10 {
        let err = service
            .log_in(
                "holder@example.com",
                &SecretString::from("Wrong-pass-1".to_string()),
                "10.0.0.1",
            )
            .expect_err("wrong password");
        match err {
            CoreError::Unauthorized => {}
            other => panic!("unexpected error: {other}"),
        }
    }
    let err = service
        .log_in("holder@example.com", &password(), "10.0.0.1")
        .expect_err("login budget exhausted");
    assert_rate_limited(err);

    // The same caller's claim budget is untouched.
    let err = service
        .claim_band("BND-000", "whatever", &sign_up(&service, "x@example.com").0, "10.0.0.1")
        .expect_err("unprovisioned");
    match err {
        CoreError::UnrecognizedToken => {}
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_sign_up_budget_counts_failures_too() {
    let (service, _clock) = service_at(1_000);
    for i in 0..5 {
        service
            .sign_up(&format!("user{i}@example.com"), &password(), "10.0.0.9")
            .expect("sign up");
    }
    let err = service
        .sign_up("user5@example.com", &password(), "10.0.0.9")
        .expect_err("budget exhausted");
    assert_rate_limited(err);
}

#[test]
fn test_provisioning_budget() {
    let (service, _clock) = service_at(1_000);
    for _ in 0..3 {
        service
            .provision_band(&admin_key(), None, "admin-host")
            .expect("provision");
    }
    let err = service
        .provision_band(&admin_key(), None, "admin-host")
        .expect_err("budget exhausted");
    assert_rate_limited(err);
}
