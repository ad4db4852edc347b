//! # LogWriter: event renderer on top of `tracing`
//!
//! A subscriber that turns incoming [`Event`]s into `tracing` records under the
//! `provisor::events` target. Install any `tracing` subscriber (e.g.
//! `tracing_subscriber::fmt`) to see them.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! DEBUG provisor::events: submitted task=3
//! DEBUG provisor::events: assigned task=3 provider=1
//!  WARN provisor::events: attempt failed task=3 provider=1 attempt=1 err="connection refused"
//!  INFO provisor::events: retry scheduled task=3 provider=1 attempt=1 delay_ms=30000
//!  WARN provisor::events: task failed task=3 provider=1 attempt=3 err="connection refused"
//!  WARN provisor::events: provider excluded provider=1 good=2
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const TARGET: &str = "provisor::events";

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.map(|t| t.0);
        let provider = e.provider.map(|p| p.0);
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::TaskSubmitted => {
                tracing::debug!(target: TARGET, ?task, "submitted");
            }
            EventKind::ProviderAssigned => {
                tracing::debug!(target: TARGET, ?task, ?provider, "assigned");
            }
            EventKind::AttemptStarting => {
                tracing::trace!(target: TARGET, ?task, ?provider, attempt = ?e.attempt, "attempt starting");
            }
            EventKind::AttemptFailed => {
                tracing::warn!(target: TARGET, ?task, ?provider, attempt = ?e.attempt, err = reason, "attempt failed");
            }
            EventKind::RetryScheduled => {
                tracing::info!(target: TARGET, ?task, ?provider, attempt = ?e.attempt, delay_ms = ?e.delay_ms, "retry scheduled");
            }
            EventKind::TaskSucceeded => {
                tracing::debug!(target: TARGET, ?task, ?provider, attempt = ?e.attempt, "task succeeded");
            }
            EventKind::TaskFailed => {
                tracing::warn!(target: TARGET, ?task, ?provider, attempt = ?e.attempt, err = reason, "task failed");
            }
            EventKind::ProviderExcluded => {
                tracing::warn!(target: TARGET, ?provider, good = ?e.limit, "provider excluded");
            }
            EventKind::ConcurrencyShrunk => {
                tracing::info!(target: TARGET, limit = ?e.limit, "concurrency shrunk");
            }
            EventKind::Drained => {
                tracing::info!(target: TARGET, "drained");
            }
            EventKind::Killed => {
                tracing::warn!(target: TARGET, "killed");
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                tracing::warn!(
                    target: TARGET,
                    subscriber = e.subscriber.unwrap_or("unknown"),
                    reason,
                    "subscriber trouble"
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
