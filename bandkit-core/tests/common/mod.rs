use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bandkit_core::{Clock, CoreConfig, CoreService, SessionToken, Store, UserId};
use secrecy::SecretString;

pub const ADMIN_KEY: &str = "test-admin-key";

/// Hand-driven clock so tests can cross window and expiry boundaries.
pub struct TestClock {
    now: AtomicU64,
}

impl TestClock {
    pub fn at(now: u64) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for TestClock {
    fn now_unix(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

pub fn admin_key() -> SecretString {
    SecretString::from(ADMIN_KEY.to_string())
}

pub fn password() -> SecretString {
    SecretString::from("Sunny-day-42".to_string())
}

pub fn service_at(now: u64) -> (CoreService, Arc<TestClock>) {
    let store = Arc::new(Store::in_memory().expect("open store"));
    let clock = Arc::new(TestClock::at(now));
    let config = CoreConfig {
        admin_key: Some(admin_key()),
        ..CoreConfig::default()
    };
    let service = CoreService::new(store, config, Arc::clone(&clock) as _);
    (service, clock)
}

pub fn sign_up(service: &CoreService, email: &str) -> (UserId, SessionToken) {
    service
        .sign_up(email, &password(), email)
        .expect("sign up")
}
