//! Deadlines and interruptible sleeps.
//!
//! A [`Deadline`] is the cancellation signal for the pipeline: a fixed
//! instant after which in-flight retries must stop scheduling work. Tasks
//! observe it at well-defined points (before each download attempt and
//! during backoff sleeps), never mid-write.

use std::thread;
use std::time::{Duration, Instant};

/// How often an interruptible sleep re-checks its deadline.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// A point in time after which work should stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Instant);

impl Deadline {
    /// A deadline `window` from now.
    pub fn after(window: Duration) -> Self {
        Deadline(Instant::now() + window)
    }

    /// A deadline `window` from now, never later than `self`.
    ///
    /// Used to nest per-artifact deadlines inside the overall one so a
    /// stuck artifact cannot consume the whole budget.
    pub fn nested(&self, window: Duration) -> Self {
        Deadline((Instant::now() + window).min(self.0))
    }

    /// Whether the deadline has passed.
    pub fn expired(&self) -> bool {
        Instant::now() >= self.0
    }

    /// Time left before expiry; zero once expired.
    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }

    /// Sleep for `duration`, waking early if the deadline passes.
    ///
    /// Returns `true` if the full duration elapsed, `false` if the
    /// deadline cut the sleep short.
    pub fn sleep(&self, duration: Duration) -> bool {
        let wake = Instant::now() + duration;
        loop {
            let now = Instant::now();
            if now >= wake {
                return true;
            }
            if now >= self.0 {
                return false;
            }
            let slice = SLEEP_SLICE.min(wake - now).min(self.0 - now);
            thread::sleep(slice);
        }
    }
}
