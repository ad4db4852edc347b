//! Interval gate for throttled progress reporting.
//!
//! ```rust
//! use std::time::{Duration, Instant};
//! use provisor::Ticker;
//!
//! let start = Instant::now();
//! let mut ticker = Ticker::new(Duration::from_secs(1), None);
//! assert!(ticker.tick(start));
//! assert!(!ticker.tick(start + Duration::from_millis(400)));
//! assert!(ticker.tick(start + Duration::from_secs(1)));
//! ```

use std::time::{Duration, Instant};

/// Fires at most once per `interval` of caller-supplied time.
#[derive(Clone, Copy, Debug)]
pub struct Ticker {
    interval: Duration,
    prev: Option<Instant>,
}

impl Ticker {
    /// Creates a ticker. With `initial = None` the first [`tick`](Self::tick) fires.
    pub fn new(interval: Duration, initial: Option<Instant>) -> Self {
        Self {
            interval,
            prev: initial,
        }
    }

    /// Returns `true` and records `now` if at least `interval` passed since the last fire.
    ///
    /// Timestamps earlier than the last fire never fire.
    pub fn tick(&mut self, now: Instant) -> bool {
        let due = match self.prev {
            None => true,
            Some(prev) => now
                .checked_duration_since(prev)
                .is_some_and(|elapsed| elapsed >= self.interval),
        };
        if due {
            self.prev = Some(now);
        }
        due
    }

    /// Interval between two fires.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}
