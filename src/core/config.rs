//! # Dispatcher configuration.
//!
//! Provides [`DispatcherConfig`], centralized settings for the dispatcher runtime.
//!
//! ## Sentinel values
//! - `attempts = 0` → treated as `1` (every assignment runs at least once)
//! - `bus_capacity = 0` → clamped to `1`
//! - `drain_poll = 0s` → drain re-checks on every scheduler turn (yield)

use std::time::Duration;

use crate::policies::RetryPolicy;

/// Global configuration for the dispatcher runtime.
///
/// ## Field semantics
/// - `attempts`: attempts per assignment before the provider is excluded
/// - `retry_wait`: fixed pause between two attempts of one assignment
/// - `drain_poll`: poll interval of the second `drain()` phase
/// - `bus_capacity`: event bus ring buffer size (min 1)
#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    /// Attempts per assignment, the first one included.
    ///
    /// After this many consecutive failures the provider is excluded for good.
    pub attempts: u32,

    /// Delay between two consecutive attempts of the same assignment.
    pub retry_wait: Duration,

    /// Poll interval used by `drain()` while waiting for the unfinished set
    /// to empty once the queue has no outstanding work.
    pub drain_poll: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items.
    pub bus_capacity: usize,
}

impl DispatcherConfig {
    /// Returns the retry policy applied to each assignment.
    #[inline]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.attempts.max(1), self.retry_wait)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for DispatcherConfig {
    /// Default configuration:
    ///
    /// - `attempts = 3`
    /// - `retry_wait = 30s`
    /// - `drain_poll = 500ms`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            attempts: 3,
            retry_wait: Duration::from_secs(30),
            drain_poll: Duration::from_millis(500),
            bus_capacity: 1024,
        }
    }
}
