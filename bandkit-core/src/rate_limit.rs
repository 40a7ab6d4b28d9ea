//! Sliding-window rate limiting keyed by (action, caller).
//!
//! Counters live in a sharded in-process map: increments are atomic per key
//! (each key hashes to exactly one shard mutex) with no cross-key ordering.
//! Expired windows are replaced lazily on the next attempt; [`RateLimiter::prune`]
//! sweeps them out for long-running processes.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, PoisonError};

use strum::AsRefStr;

use crate::clock::Clock;
use crate::config::RateLimitConfig;
use crate::error::{CoreError, CoreResult};

const SHARD_COUNT: usize = 16;

/// Actions guarded by the rate limiter. Every credential-bearing operation
/// has its own budget so a burst of failed claims cannot lock a caller out
/// of logging in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum RateAction {
    /// Account creation.
    SignUp,
    /// Password login.
    LogIn,
    /// Band claim attempt.
    Claim,
    /// Admin provisioning.
    Provision,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: u64,
}

type Shard = Mutex<HashMap<(RateAction, String), Window>>;

/// Shared attempt counter for credential-bearing operations.
pub struct RateLimiter {
    shards: Vec<Shard>,
    policy: RateLimitConfig,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Creates a limiter with the given per-action budgets.
    #[must_use]
    pub fn new(policy: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        let shards = (0..SHARD_COUNT).map(|_| Mutex::new(HashMap::new())).collect();
        Self {
            shards,
            policy,
            clock,
        }
    }

    /// Records an attempt for `(action, caller)`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RateLimited`] with a positive retry-after once
    /// the caller exceeds the action's budget inside the current window.
    pub fn check(&self, action: RateAction, caller: &str) -> CoreResult<()> {
        let now = self.clock.now_unix();
        let max_attempts = self.policy.attempts_for(action);
        let mut shard = self
            .shard_for(action, caller)
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let window = shard
            .entry((action, caller.to_string()))
            .or_insert(Window {
                count: 0,
                reset_at: now + self.policy.window_secs,
            });
        if now >= window.reset_at {
            window.count = 0;
            window.reset_at = now + self.policy.window_secs;
        }
        window.count += 1;
        if window.count > max_attempts {
            let retry_after_secs = window.reset_at.saturating_sub(now).max(1);
            tracing::warn!(
                action = action.as_ref(),
                caller,
                retry_after_secs,
                "rate limit exceeded"
            );
            return Err(CoreError::RateLimited { retry_after_secs });
        }
        Ok(())
    }

    /// Removes every expired window. Safe to call from a periodic sweeper.
    pub fn prune(&self) {
        let now = self.clock.now_unix();
        for shard in &self.shards {
            let mut map = shard.lock().unwrap_or_else(PoisonError::into_inner);
            map.retain(|_, window| window.reset_at > now);
        }
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.lock().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    fn shard_for(&self, action: RateAction, caller: &str) -> &Shard {
        let mut hasher = DefaultHasher::new();
        action.hash(&mut hasher);
        caller.hash(&mut hasher);
        let index = usize::try_from(hasher.finish()).unwrap_or(usize::MAX) % SHARD_COUNT;
        &self.shards[index]
    }
}
