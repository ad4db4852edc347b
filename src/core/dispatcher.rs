//! # Dispatcher: fans tasks out across a pool of providers.
//!
//! The [`Dispatcher`] owns the provider pool, the concurrency-bounded queue, the
//! event bus and the set of unfinished tasks.
//!
//! ## Key responsibilities
//! - hand each submitted task to the next available provider (round robin)
//! - run the handler under the retry policy, one assignment per provider at a time
//! - exclude providers that exhaust their retry budget and shrink concurrency
//! - report completion through [`Dispatcher::drain`]
//!
//! ## High-level architecture
//! ```text
//! submit(task)
//!   ├─► unfinished += task_id                         publish TaskSubmitted
//!   ├─► pool.acquire()  (waits; NoGoodProviders if none left)
//!   │                                                 publish ProviderAssigned
//!   └─► queue.push(execute(assignment))  ── returns here ──►  Ok(task_id)
//!
//! execute(assignment)                      (spawned, bounded by queue ceiling)
//!   ├─► runner::run_assignment (retry policy, attempt events)
//!   ├─ Ok  ─► pool.release(provider)                  publish TaskSucceeded
//!   ├─ Err ─► pool.exclude(provider) ─► queue.shrink_to(good)
//!   │                                   publish ProviderExcluded / ConcurrencyShrunk / TaskFailed
//!   └─► unfinished -= task_id
//!
//! drain()
//!   ├─► queue.wait_idle()
//!   └─► poll every cfg.drain_poll until unfinished is empty
//! ```
//!
//! Permanent failure is **not** returned from `submit`; it is logged and
//! published as `EventKind::TaskFailed`. Use [`Dispatcher::subscribe`] or a
//! [`Subscribe`](crate::Subscribe) implementation to observe it.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use provisor::{Dispatcher, DispatcherConfig, HandlerFn, HandlerRef, TaskError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let handler: HandlerRef<u64, String> = HandlerFn::arc(|block: Arc<u64>, rpc: Arc<String>| async move {
//!         if rpc.is_empty() {
//!             return Err(TaskError::fail(format!("block {block}: no endpoint")));
//!         }
//!         Ok(())
//!     });
//!
//!     let dispatcher = Dispatcher::builder(handler, vec!["rpc-a".to_string(), "rpc-b".to_string()])
//!         .with_config(DispatcherConfig {
//!             retry_wait: Duration::from_millis(10),
//!             ..DispatcherConfig::default()
//!         })
//!         .build()?;
//!
//!     for block in 0..10u64 {
//!         dispatcher.submit(block).await?;
//!     }
//!     dispatcher.drain().await;
//!     assert_eq!(dispatcher.running_count(), 0);
//!     Ok(())
//! }
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::core::{
    builder::DispatcherBuilder,
    config::DispatcherConfig,
    ids::{ProviderId, TaskId},
    pool::ProviderPool,
    queue::AssignmentQueue,
    runner::{Assignment, run_assignment},
};
use crate::error::DispatchError;
use crate::events::{Bus, Event, EventKind};
use crate::handlers::HandlerRef;

/// Bounded-concurrency dispatcher over interchangeable providers.
///
/// Always handled through an `Arc` (see [`Dispatcher::builder`]); spawned
/// assignments keep the dispatcher alive until they finish.
pub struct Dispatcher<T, P>
where
    T: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    cfg: DispatcherConfig,
    handler: HandlerRef<T, P>,
    providers: Vec<Arc<P>>,
    pool: ProviderPool,
    queue: Arc<AssignmentQueue>,
    unfinished: Mutex<HashSet<TaskId>>,
    next_task: AtomicU64,
    bus: Bus,
    /// Stops the subscriber listener when the dispatcher goes away.
    listener_token: CancellationToken,
}

impl<T, P> Dispatcher<T, P>
where
    T: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    /// Starts building a dispatcher for `handler` over `providers`.
    pub fn builder(
        handler: HandlerRef<T, P>,
        providers: impl IntoIterator<Item = P>,
    ) -> DispatcherBuilder<T, P> {
        DispatcherBuilder::new(handler, providers)
    }

    /// Creates a dispatcher with default configuration and no subscribers.
    ///
    /// Fails with [`DispatchError::EmptyProviderList`] if `providers` is empty.
    pub fn new(
        handler: HandlerRef<T, P>,
        providers: impl IntoIterator<Item = P>,
    ) -> Result<Arc<Self>, DispatchError> {
        Self::builder(handler, providers).build()
    }

    pub(crate) fn new_internal(
        cfg: DispatcherConfig,
        handler: HandlerRef<T, P>,
        providers: Vec<Arc<P>>,
        bus: Bus,
        listener_token: CancellationToken,
    ) -> Self {
        let size = providers.len();
        Self {
            cfg,
            handler,
            providers,
            pool: ProviderPool::new(size),
            queue: AssignmentQueue::new(size),
            unfinished: Mutex::new(HashSet::new()),
            next_task: AtomicU64::new(0),
            bus,
            listener_token,
        }
    }

    /// Submits a task and waits until it is scheduled (not until it completes).
    ///
    /// ### Errors
    /// - [`DispatchError::NoGoodProviders`] once every provider is excluded.
    /// - [`DispatchError::Killed`] after [`kill`](Self::kill).
    ///
    /// Permanent failure of the task itself is never reported here.
    pub async fn submit(self: &Arc<Self>, task: T) -> Result<TaskId, DispatchError> {
        if self.queue.is_killed() {
            return Err(DispatchError::Killed);
        }

        let task_id = TaskId(self.next_task.fetch_add(1, Ordering::Relaxed));
        self.unfinished.lock().insert(task_id);
        self.bus
            .publish(Event::new(EventKind::TaskSubmitted).with_task(task_id));

        let acquired = tokio::select! {
            res = self.pool.acquire() => res,
            _ = self.queue.killed() => Err(DispatchError::Killed),
        };
        let provider_id = match acquired {
            Ok(id) => id,
            Err(e) => {
                self.unfinished.lock().remove(&task_id);
                return Err(e);
            }
        };
        self.bus.publish(
            Event::new(EventKind::ProviderAssigned)
                .with_task(task_id)
                .with_provider(provider_id),
        );

        let assignment = Assignment {
            task_id,
            task: Arc::new(task),
            provider_id,
            provider: Arc::clone(&self.providers[provider_id.0]),
        };
        let me = Arc::clone(self);
        if let Err(e) = self.queue.push(async move { me.execute(assignment).await }) {
            self.unfinished.lock().remove(&task_id);
            self.pool.release(provider_id);
            return Err(e);
        }
        Ok(task_id)
    }

    /// Waits until every previously submitted task reached a terminal state.
    ///
    /// Returns early if the dispatcher is killed meanwhile.
    pub async fn drain(&self) {
        self.queue.wait_idle().await;

        let poll = self.cfg.drain_poll;
        while !self.queue.is_killed() && self.unfinished_count() > 0 {
            let pause = async {
                if poll.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    tokio::time::sleep(poll).await;
                }
            };
            tokio::select! {
                _ = pause => {}
                _ = self.queue.killed() => {}
            }
        }

        if !self.queue.is_killed() {
            self.bus.publish(Event::new(EventKind::Drained));
        }
    }

    /// Stops scheduling: queued assignments are dropped, running ones are left
    /// to finish on their own and are no longer tracked by [`drain`](Self::drain).
    pub fn kill(&self) {
        if self.queue.is_killed() {
            return;
        }
        self.queue.kill();
        tracing::warn!(
            running = self.queue.running(),
            unfinished = self.unfinished_count(),
            "dispatcher killed"
        );
        self.bus.publish(Event::new(EventKind::Killed));
    }

    /// Number of assignments currently executing.
    pub fn running_count(&self) -> usize {
        self.queue.running()
    }

    /// Number of submitted tasks that are not terminal yet.
    pub fn unfinished_count(&self) -> usize {
        self.unfinished.lock().len()
    }

    /// Current concurrency ceiling (equals the good provider count).
    pub fn concurrency_limit(&self) -> usize {
        self.queue.concurrency()
    }

    /// Number of providers that are still in rotation.
    pub fn good_provider_count(&self) -> usize {
        self.pool.good_count()
    }

    /// Number of good providers that are idle right now.
    pub fn available_provider_count(&self) -> usize {
        self.pool.available_count()
    }

    /// True if the provider was excluded after exhausting its retry budget.
    pub fn is_excluded(&self, id: ProviderId) -> bool {
        self.pool.is_excluded(id)
    }

    /// Providers excluded so far, in construction order.
    pub fn excluded_providers(&self) -> Vec<ProviderId> {
        self.pool.excluded()
    }

    /// Provider behind an id.
    pub fn provider(&self, id: ProviderId) -> Option<&Arc<P>> {
        self.providers.get(id.0)
    }

    /// All providers in construction order.
    pub fn providers(&self) -> &[Arc<P>] {
        &self.providers
    }

    /// True once [`kill`](Self::kill) was called.
    pub fn is_killed(&self) -> bool {
        self.queue.is_killed()
    }

    /// Effective configuration.
    pub fn config(&self) -> &DispatcherConfig {
        &self.cfg
    }

    /// Receiver observing every event published after this call.
    ///
    /// This is the out-of-band channel for per-task outcomes.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Runs one assignment and settles its bookkeeping.
    async fn execute(&self, a: Assignment<T, P>) {
        let policy = self.cfg.retry_policy();

        match run_assignment(self.handler.as_ref(), &a, policy, &self.bus).await {
            Ok(attempts) => {
                self.pool.release(a.provider_id);
                self.bus.publish(
                    Event::new(EventKind::TaskSucceeded)
                        .with_task(a.task_id)
                        .with_provider(a.provider_id)
                        .with_attempt(attempts),
                );
            }
            Err((attempts, err)) => {
                tracing::warn!(
                    task = %a.task_id,
                    provider = %a.provider_id,
                    attempts,
                    error = %err,
                    "excluding provider due to max number of attempts"
                );
                let remaining = self.pool.exclude(a.provider_id);
                self.bus.publish(
                    Event::new(EventKind::ProviderExcluded)
                        .with_provider(a.provider_id)
                        .with_limit(remaining),
                );
                if self.queue.shrink_to(remaining) {
                    self.bus
                        .publish(Event::new(EventKind::ConcurrencyShrunk).with_limit(remaining));
                }
                self.bus.publish(
                    Event::new(EventKind::TaskFailed)
                        .with_task(a.task_id)
                        .with_provider(a.provider_id)
                        .with_attempt(attempts)
                        .with_reason(err.to_string()),
                );
            }
        }

        self.unfinished.lock().remove(&a.task_id);
    }
}

impl<T, P> Drop for Dispatcher<T, P>
where
    T: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.listener_token.cancel();
    }
}
