use std::time::{Duration, Instant};

/// Time budget of one search, shared by every provider call it makes.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Option<Duration>,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget: Some(budget),
        }
    }

    pub fn none() -> Self {
        Self {
            started: Instant::now(),
            budget: None,
        }
    }

    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }

    /// Time left, `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.budget
            .map(|budget| budget.saturating_sub(self.started.elapsed()))
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_some_and(|left| left.is_zero())
    }

    /// Whether waiting `wait` would still leave time for the call itself.
    pub fn allows_wait(&self, wait: Duration) -> bool {
        self.remaining().is_none_or(|left| wait < left)
    }

    /// Per-request HTTP timeout: `cap`, shortened to the time left.
    pub fn request_timeout(&self, cap: Duration) -> Duration {
        self.remaining().map_or(cap, |left| left.min(cap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded() {
        let deadline = Deadline::none();
        assert!(!deadline.is_expired());
        assert_eq!(deadline.remaining(), None);
        assert!(deadline.allows_wait(Duration::from_secs(3600)));
        assert_eq!(deadline.request_timeout(Duration::from_secs(35)), Duration::from_secs(35));
    }

    #[test]
    fn test_expired() {
        let deadline = Deadline::after(Duration::ZERO);
        assert!(deadline.is_expired());
        assert!(!deadline.allows_wait(Duration::ZERO));
        assert_eq!(deadline.request_timeout(Duration::from_secs(35)), Duration::ZERO);
    }

    #[test]
    fn test_request_timeout_is_capped_by_time_left() {
        let deadline = Deadline::after(Duration::from_secs(2));
        assert!(deadline.request_timeout(Duration::from_secs(35)) <= Duration::from_secs(2));
        assert_eq!(deadline.request_timeout(Duration::from_millis(10)), Duration::from_millis(10));
        assert!(!deadline.allows_wait(Duration::from_secs(5)));
    }
}
