//! Wall-clock abstraction for expiry decisions
//!
//! Cache entries carry persisted wall-clock timestamps, so expiry is
//! computed against `DateTime<Utc>` rather than a monotonic instant.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};

/// Source of "now". Injectable so tests can steer time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for tests. Clones share the same underlying
/// time, so advancing one advances them all.
#[derive(Debug, Clone)]
pub struct MockClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(start: DateTime<Utc>) -> Self {
        Self { now: Arc::new(Mutex::new(start)) }
    }

    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now = *now + delta;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_clock_clones_share_time() {
        let clock = MockClock::new();
        let twin = clock.clone();
        let before = twin.now();

        clock.advance(TimeDelta::hours(2));

        assert_eq!(twin.now(), before + TimeDelta::hours(2));
    }
}
