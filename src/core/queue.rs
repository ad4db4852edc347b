//! # Concurrency-bounded assignment queue.
//!
//! Runs assignment futures with a ceiling on how many execute at once. The
//! ceiling starts at the provider count and can only be lowered.
//!
//! ## Architecture
//! ```text
//! push(job) ──► outstanding += 1 ──► spawn ──► acquire permit (cancellable by kill)
//!                                               ├─ killed  → drop job
//!                                               └─ permit  → running += 1
//!                                                            job.await
//!                                                            running -= 1
//!                                                            retire(permit)
//!                                              outstanding -= 1 ──► notify idle
//! ```
//!
//! ## Shrinking
//! Lowering the ceiling never aborts running jobs. Idle permits are forgotten
//! immediately; the rest become **debt** that is paid back by forgetting permits
//! as running jobs return them. Logical capacity may therefore briefly sit
//! below the number of jobs still running.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::error::DispatchError;

/// Ceiling bookkeeping (guarded together so that limit and debt stay consistent).
#[derive(Debug)]
struct Ceiling {
    limit: usize,
    debt: usize,
}

/// Queue executing jobs with a shrinking concurrency ceiling.
#[derive(Debug)]
pub struct AssignmentQueue {
    semaphore: Arc<Semaphore>,
    ceiling: Mutex<Ceiling>,
    running: AtomicUsize,
    outstanding: AtomicUsize,
    idle: Notify,
    killed: CancellationToken,
    kill_flag: AtomicBool,
}

impl AssignmentQueue {
    /// Creates a queue with the given initial ceiling.
    pub fn new(limit: usize) -> Arc<Self> {
        Arc::new(Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            ceiling: Mutex::new(Ceiling { limit, debt: 0 }),
            running: AtomicUsize::new(0),
            outstanding: AtomicUsize::new(0),
            idle: Notify::new(),
            killed: CancellationToken::new(),
            kill_flag: AtomicBool::new(false),
        })
    }

    /// Accepts a job; returns as soon as it is queued, not when it finishes.
    ///
    /// Must be called from within a tokio runtime.
    pub fn push<F>(self: &Arc<Self>, job: F) -> Result<(), DispatchError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_killed() {
            return Err(DispatchError::Killed);
        }
        self.outstanding.fetch_add(1, Ordering::SeqCst);

        let me = Arc::clone(self);
        tokio::spawn(async move {
            let permit = tokio::select! {
                biased;
                _ = me.killed.cancelled() => None,
                res = Arc::clone(&me.semaphore).acquire_owned() => res.ok(),
            };

            if let Some(permit) = permit {
                me.running.fetch_add(1, Ordering::SeqCst);
                job.await;
                me.running.fetch_sub(1, Ordering::SeqCst);
                me.retire(permit);
            }
            me.finish_one();
        });
        Ok(())
    }

    /// Lowers the ceiling to `limit`; larger values are ignored.
    ///
    /// Returns `true` if the ceiling changed.
    pub fn shrink_to(&self, limit: usize) -> bool {
        let mut c = self.ceiling.lock();
        if limit >= c.limit {
            return false;
        }
        let diff = c.limit - limit;
        c.limit = limit;
        let forgotten = self.semaphore.forget_permits(diff);
        c.debt += diff - forgotten;
        true
    }

    /// Current concurrency ceiling.
    pub fn concurrency(&self) -> usize {
        self.ceiling.lock().limit
    }

    /// Number of jobs currently executing.
    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    /// Number of accepted jobs that have not finished (waiting + running).
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Stops starting new jobs. Running jobs are left alone.
    pub fn kill(&self) {
        self.kill_flag.store(true, Ordering::SeqCst);
        self.killed.cancel();
    }

    /// True once [`kill`](Self::kill) was called.
    pub fn is_killed(&self) -> bool {
        self.kill_flag.load(Ordering::SeqCst)
    }

    /// Resolves once [`kill`](Self::kill) was called.
    pub async fn killed(&self) {
        self.killed.cancelled().await;
    }

    /// Resolves when no accepted job is outstanding, or when the queue is killed.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.outstanding() == 0 {
                return;
            }
            tokio::select! {
                _ = &mut notified => {}
                _ = self.killed.cancelled() => return,
            }
        }
    }

    /// Returns a permit, forgetting it instead if the ceiling was lowered meanwhile.
    fn retire(&self, permit: OwnedSemaphorePermit) {
        let mut c = self.ceiling.lock();
        if c.debt > 0 {
            c.debt -= 1;
            permit.forget();
        } else {
            drop(permit);
        }
    }

    fn finish_one(&self) {
        if self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    #[cfg(test)]
    fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}
