//! # Run one assignment under the retry policy.
//!
//! Executes a (task, provider) assignment: the handler is attempted up to
//! `policy.attempts` times with a fixed pause in between, and lifecycle events
//! are published to the [`Bus`].
//!
//! ## Event flow
//! ```text
//! attempt n:
//!   publish AttemptStarting ─► handler.handle() ─► Ok  ─► return Ok(n)
//!                                               └─► Err ─► publish AttemptFailed
//!                                                          ├─ n < max ─► publish RetryScheduled, sleep(wait)
//!                                                          └─ n = max ─► return Err((n, err))
//! ```
//!
//! ## Rules
//! - Attempts run **sequentially** on the same provider.
//! - A panicking handler counts as a failed attempt ([`TaskError::Panicked`]).
//! - Terminal events (`TaskSucceeded`/`TaskFailed`) are left to the caller,
//!   which also owns pool bookkeeping.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use crate::core::ids::{ProviderId, TaskId};
use crate::error::{TaskError, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::handlers::Handler;
use crate::policies::RetryPolicy;

/// One scheduled (task, provider) pairing.
pub struct Assignment<T, P> {
    pub task_id: TaskId,
    pub task: Arc<T>,
    pub provider_id: ProviderId,
    pub provider: Arc<P>,
}

/// Runs `assignment` until success or until the retry budget is spent.
///
/// Returns the number of attempts used, alongside the last error on failure.
pub async fn run_assignment<T, P>(
    handler: &dyn Handler<T, P>,
    assignment: &Assignment<T, P>,
    policy: RetryPolicy,
    bus: &Bus,
) -> Result<u32, (u32, TaskError)>
where
    T: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    let mut used = 0u32;
    let task_id = assignment.task_id;
    let provider_id = assignment.provider_id;

    let res = policy
        .execute_with(
            |attempt| {
                used = attempt;
                bus.publish(
                    Event::new(EventKind::AttemptStarting)
                        .with_task(task_id)
                        .with_provider(provider_id)
                        .with_attempt(attempt),
                );
                let fut = handler.handle(
                    Arc::clone(&assignment.task),
                    Arc::clone(&assignment.provider),
                );
                async move {
                    let res = match AssertUnwindSafe(fut).catch_unwind().await {
                        Ok(res) => res,
                        Err(panic) => Err(TaskError::Panicked {
                            info: panic_message(panic.as_ref()),
                        }),
                    };
                    if let Err(e) = &res {
                        publish_failed(bus, task_id, provider_id, attempt, e);
                    }
                    res
                }
            },
            |attempt, err| {
                bus.publish(
                    Event::new(EventKind::RetryScheduled)
                        .with_task(task_id)
                        .with_provider(provider_id)
                        .with_attempt(attempt)
                        .with_delay(policy.wait)
                        .with_reason(err.to_string()),
                );
            },
        )
        .await;

    res.map(|()| used).map_err(|e| (used, e))
}

/// Publishes `AttemptFailed` with error details.
fn publish_failed(bus: &Bus, task: TaskId, provider: ProviderId, attempt: u32, err: &TaskError) {
    bus.publish(
        Event::new(EventKind::AttemptFailed)
            .with_task(task)
            .with_provider(provider)
            .with_attempt(attempt)
            .with_reason(err.to_string()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::HandlerFn;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::sync::broadcast::Receiver;

    fn assignment() -> Assignment<u32, &'static str> {
        Assignment {
            task_id: TaskId(9),
            task: Arc::new(1),
            provider_id: ProviderId(2),
            provider: Arc::new("node-a"),
        }
    }

    fn drain_kinds(rx: &mut Receiver<Event>) -> Vec<(EventKind, Option<u32>)> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push((ev.kind, ev.attempt));
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_retry_publishes_attempt_events() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let calls = Arc::new(AtomicU32::new(0));
        let handler = HandlerFn::new({
            let calls = calls.clone();
            move |_t: Arc<u32>, _p: Arc<&'static str>| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(TaskError::fail("cold start"))
                    } else {
                        Ok(())
                    }
                }
            }
        });

        let res = run_assignment(
            &handler,
            &assignment(),
            RetryPolicy::new(3, Duration::from_millis(10)),
            &bus,
        )
        .await;

        assert_eq!(res, Ok(2));
        assert_eq!(
            drain_kinds(&mut rx),
            vec![
                (EventKind::AttemptStarting, Some(1)),
                (EventKind::AttemptFailed, Some(1)),
                (EventKind::RetryScheduled, Some(1)),
                (EventKind::AttemptStarting, Some(2)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reports_last_error_and_attempts() {
        let bus = Bus::new(64);
        let handler = HandlerFn::new(|_t: Arc<u32>, p: Arc<&'static str>| async move {
            Err::<(), _>(TaskError::fail(format!("{p} down")))
        });

        let res = run_assignment(
            &handler,
            &assignment(),
            RetryPolicy::new(3, Duration::from_millis(10)),
            &bus,
        )
        .await;

        assert_eq!(res, Err((3, TaskError::fail("node-a down"))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_handler_counts_as_failed_attempt() {
        let bus = Bus::new(64);
        let handler = HandlerFn::new(|_t: Arc<u32>, _p: Arc<&'static str>| async move {
            if true {
                panic!("handler bug");
            }
            Ok::<(), TaskError>(())
        });

        let res = run_assignment(
            &handler,
            &assignment(),
            RetryPolicy::new(2, Duration::from_millis(1)),
            &bus,
        )
        .await;

        assert_eq!(
            res,
            Err((
                2,
                TaskError::Panicked {
                    info: "handler bug".into()
                }
            ))
        );
    }
}
