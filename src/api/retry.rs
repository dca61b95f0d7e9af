use std::thread;
use std::time::Duration;
use tracing::warn;

use super::{Deadline, ProviderError};

/// Bounded delay-and-retry for throttled or overloaded providers
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Base delay; attempt `n` waits `n * delay`
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Run `op`, retrying retryable failures up to `max_retries` times.
    ///
    /// The last error is returned once retries are exhausted. No attempt
    /// starts, and no backoff is slept, past `deadline`.
    pub fn run<T>(
        &self,
        provider: &'static str,
        deadline: &Deadline,
        mut op: impl FnMut() -> Result<T, ProviderError>,
    ) -> Result<T, ProviderError> {
        let mut attempt = 0;
        loop {
            if deadline.is_expired() {
                return Err(ProviderError::DeadlineExceeded { provider });
            }

            match op() {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let wait = self.delay * attempt;
                    if !deadline.allows_wait(wait) {
                        warn!(provider, attempt, error = %e, "no time left to retry");
                        return Err(ProviderError::DeadlineExceeded { provider });
                    }
                    warn!(
                        provider,
                        attempt,
                        max_retries = self.max_retries,
                        wait_ms = wait.as_millis() as u64,
                        error = %e,
                        "provider request failed, retrying"
                    );
                    thread::sleep(wait);
                }
                other => return other,
            }
        }
    }
}
