//! Time source abstraction.

use std::time::{SystemTime, UNIX_EPOCH};

/// Source of unix timestamps for `updated_at` stamps, session expiry and
/// rate-limit windows. Injected so tests can drive time forward.
pub trait Clock: Send + Sync {
    /// Seconds since the unix epoch.
    fn now_unix(&self) -> u64;
}

/// Wall-clock implementation, clamped to zero before the epoch.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |duration| duration.as_secs())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::Clock;

    /// Hand-driven clock for expiry and window tests.
    #[derive(Debug, Default)]
    pub struct ManualClock {
        now: AtomicU64,
    }

    impl ManualClock {
        pub fn at(now: u64) -> Self {
            Self {
                now: AtomicU64::new(now),
            }
        }

        pub fn advance(&self, secs: u64) {
            self.now.fetch_add(secs, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_unix(&self) -> u64 {
            self.now.load(Ordering::SeqCst)
        }
    }
}
