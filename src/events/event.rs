//! # Runtime events emitted by the dispatcher.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Task events**: submission, assignment, attempts, terminal outcome
//! - **Pool events**: provider exclusion and concurrency shrink
//! - **Runtime events**: drain/kill and subscriber health
//!
//! The [`Event`] struct carries additional metadata such as timestamps, task id,
//! provider id, attempt numbers and retry delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use provisor::{Event, EventKind, ProviderId, TaskId};
//!
//! let ev = Event::new(EventKind::RetryScheduled)
//!     .with_task(TaskId(7))
//!     .with_provider(ProviderId(1))
//!     .with_attempt(2)
//!     .with_delay(Duration::from_secs(30))
//!     .with_reason("connection refused");
//!
//! assert_eq!(ev.kind, EventKind::RetryScheduled);
//! assert_eq!(ev.task, Some(TaskId(7)));
//! assert_eq!(ev.delay_ms, Some(30_000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::{ProviderId, TaskId};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Task events ===
    /// Task entered the unfinished set and waits for a provider.
    ///
    /// Sets:
    /// - `task`: task id
    TaskSubmitted,

    /// A provider was acquired for the task (assignment created).
    ///
    /// Sets:
    /// - `task`: task id
    /// - `provider`: chosen provider
    ProviderAssigned,

    /// Handler attempt is starting.
    ///
    /// Sets:
    /// - `task`, `provider`
    /// - `attempt`: attempt number (1-based, per assignment)
    AttemptStarting,

    /// Handler attempt failed.
    ///
    /// Sets:
    /// - `task`, `provider`, `attempt`
    /// - `reason`: failure message
    AttemptFailed,

    /// Next attempt scheduled after a failure.
    ///
    /// Sets:
    /// - `task`, `provider`
    /// - `attempt`: failed attempt number
    /// - `delay_ms`: pause before the next attempt (ms)
    /// - `reason`: last failure message
    RetryScheduled,

    /// Assignment succeeded; the provider is available again.
    ///
    /// Sets:
    /// - `task`, `provider`, `attempt`
    TaskSucceeded,

    /// Retry budget exhausted; the task is permanently failed.
    ///
    /// Sets:
    /// - `task`, `provider`, `attempt`
    /// - `reason`: last failure message
    TaskFailed,

    // === Pool events ===
    /// Provider permanently removed from rotation.
    ///
    /// Sets:
    /// - `provider`: excluded provider
    /// - `limit`: remaining good providers
    ProviderExcluded,

    /// Queue concurrency ceiling lowered.
    ///
    /// Sets:
    /// - `limit`: new ceiling
    ConcurrencyShrunk,

    // === Runtime events ===
    /// `drain()` observed every submitted task in a terminal state.
    Drained,

    /// `kill()` was called; no further assignments start.
    Killed,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Task the event refers to.
    pub task: Option<TaskId>,
    /// Provider the event refers to.
    pub provider: Option<ProviderId>,
    /// Attempt number (starting from 1).
    pub attempt: Option<u32>,
    /// Retry delay before the next attempt in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Concurrency ceiling / good provider count after the event.
    pub limit: Option<usize>,
    /// Subscriber name (subscriber events only).
    pub subscriber: Option<&'static str>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            provider: None,
            attempt: None,
            delay_ms: None,
            limit: None,
            subscriber: None,
            reason: None,
        }
    }

    /// Attaches a task id.
    #[inline]
    pub fn with_task(mut self, task: TaskId) -> Self {
        self.task = Some(task);
        self
    }

    /// Attaches a provider id.
    #[inline]
    pub fn with_provider(mut self, provider: ProviderId) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a retry delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a concurrency ceiling / good provider count.
    #[inline]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        let mut ev = Event::new(EventKind::SubscriberOverflow).with_reason(reason);
        ev.subscriber = Some(subscriber);
        ev
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        let mut ev = Event::new(EventKind::SubscriberPanicked).with_reason(info);
        ev.subscriber = Some(subscriber);
        ev
    }

    /// True for events produced by the subscriber machinery itself.
    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}
