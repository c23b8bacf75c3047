//! Time sources for record timestamps.
//!
//! Remote records are keyed by a millisecond timestamp, so two events in the
//! same millisecond would overwrite each other. [`SystemClock`] hands out
//! strictly increasing values to keep those keys unique.

use std::sync::atomic::{AtomicI64, Ordering};

/// Source of millisecond timestamps.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// Wall clock that never returns the same value twice.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicI64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        let wall = chrono::Utc::now().timestamp_millis();
        let mut previous = self.last.load(Ordering::Relaxed);
        loop {
            let next = wall.max(previous + 1);
            match self
                .last
                .compare_exchange_weak(previous, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => previous = actual,
            }
        }
    }
}

/// Clock driven by hand, for tests and replays.
///
/// Each reading advances the clock by one millisecond so consecutive records
/// still get distinct keys.
#[derive(Debug)]
pub struct ManualClock {
    current: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            current: AtomicI64::new(start_millis),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, millis: i64) {
        self.current.fetch_add(millis, Ordering::Relaxed);
    }

    /// Value the next reading will return.
    pub fn peek(&self) -> i64 {
        self.current.load(Ordering::Relaxed)
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.current.fetch_add(1, Ordering::Relaxed)
    }
}
