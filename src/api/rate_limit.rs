use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use super::Deadline;

/// Minimum-interval gate shared by every request that talks to one provider.
///
/// Callers are serialized: the lock is held while waiting, so at most one
/// call is released per `min_interval`.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    /// Block until the next call is allowed, then record it.
    ///
    /// Returns `false` without waiting or taking the slot when the wait would
    /// run past `deadline`.
    pub fn acquire(&self, deadline: &Deadline) -> bool {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);

        let wait = last
            .map(|prev| self.min_interval.saturating_sub(prev.elapsed()))
            .unwrap_or_default();
        if deadline.is_expired() || !deadline.allows_wait(wait) {
            return false;
        }
        if !wait.is_zero() {
            thread::sleep(wait);
        }

        *last = Some(Instant::now());
        true
    }
}
