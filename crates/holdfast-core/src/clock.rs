//! Wall-clock sources for the engine.
//!
//! Every pass reads "now" through a [`Clock`] so tests can pin and move time
//! without sleeping. The tick counter is separate: it lives in the
//! scheduler and only counts fixed-rate steps.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, TimeDelta, Utc};

/// A source of the current wall-clock time.
pub trait Clock: Send + Sync {
    /// Return the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Stores milliseconds since the epoch in an atomic so it can be shared
/// between the scheduler and test code without locking.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Create a clock pinned at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(start.timestamp_millis()),
        }
    }

    /// Jump to `at`.
    pub fn set(&self, at: DateTime<Utc>) {
        self.millis.store(at.timestamp_millis(), Ordering::Release);
    }

    /// Move the clock forward (or backward, for negative deltas).
    pub fn advance(&self, by: TimeDelta) {
        let delta = by.num_milliseconds();
        // fetch_update never fails when the closure always returns Some.
        let _ = self
            .millis
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_add(delta))
            });
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::Acquire))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
