//! # Provider pool: good/available/busy partition with round-robin selection.
//!
//! The pool owns the identity of every provider given at construction and tracks
//! which of them may still be used.
//!
//! ## Partition
//! ```text
//!   all ──┬── good ──┬── available   (idle, can be acquired)
//!         │          └── busy        (holding exactly one assignment)
//!         └── excluded               (terminal, never acquired again)
//! ```
//!
//! ## Rules
//! - `available ⊆ good ⊆ all`; `excluded = all − good`.
//! - Selection picks `available[cursor % available.len()]`; the cursor only grows.
//! - `release` appends to the end of the available list.
//! - `exclude` is terminal and wakes every waiter, so that blocked acquirers
//!   fail fast once nothing good remains.
//! - All mutation happens under one mutex; acquire-then-remove is atomic.

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::core::ids::ProviderId;
use crate::error::DispatchError;

/// Mutable pool state (guarded by the pool mutex).
#[derive(Debug)]
struct PoolState {
    /// Providers that have not exhausted their failure budget, in construction order.
    good: Vec<ProviderId>,
    /// Idle good providers, in release order.
    available: Vec<ProviderId>,
    /// Monotonic round-robin cursor.
    cursor: usize,
}

/// Provider pool with notifying wait.
#[derive(Debug)]
pub struct ProviderPool {
    size: usize,
    state: Mutex<PoolState>,
    changed: Notify,
}

impl ProviderPool {
    /// Creates a pool of `size` providers, all good and available.
    pub fn new(size: usize) -> Self {
        let all: Vec<ProviderId> = (0..size).map(ProviderId).collect();
        Self {
            size,
            state: Mutex::new(PoolState {
                good: all.clone(),
                available: all,
                cursor: 0,
            }),
            changed: Notify::new(),
        }
    }

    /// Waits for an available provider and marks it busy.
    ///
    /// Fails with [`DispatchError::NoGoodProviders`] without waiting once every
    /// provider is excluded.
    pub async fn acquire(&self) -> Result<ProviderId, DispatchError> {
        loop {
            // Register interest before inspecting state so a release between the
            // check and the await is not lost.
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(res) = self.try_acquire() {
                return res;
            }
            notified.await;
        }
    }

    /// Non-waiting form of [`acquire`](Self::acquire).
    ///
    /// Returns `None` when good providers exist but all of them are busy.
    pub fn try_acquire(&self) -> Option<Result<ProviderId, DispatchError>> {
        let mut st = self.state.lock();
        if st.good.is_empty() {
            return Some(Err(DispatchError::NoGoodProviders));
        }
        if st.available.is_empty() {
            return None;
        }
        let idx = st.cursor % st.available.len();
        let id = st.available.remove(idx);
        st.cursor = st.cursor.wrapping_add(1);
        Some(Ok(id))
    }

    /// Returns a busy provider to the available list.
    ///
    /// Excluded or already-available providers are ignored.
    pub fn release(&self, id: ProviderId) {
        {
            let mut st = self.state.lock();
            if !st.good.contains(&id) || st.available.contains(&id) {
                return;
            }
            st.available.push(id);
        }
        self.changed.notify_waiters();
    }

    /// Permanently removes a provider from rotation.
    ///
    /// Returns the number of good providers left.
    pub fn exclude(&self, id: ProviderId) -> usize {
        let remaining = {
            let mut st = self.state.lock();
            st.good.retain(|p| *p != id);
            st.available.retain(|p| *p != id);
            st.good.len()
        };
        self.changed.notify_waiters();
        remaining
    }

    /// Number of providers that are still good.
    pub fn good_count(&self) -> usize {
        self.state.lock().good.len()
    }

    /// Number of idle good providers.
    pub fn available_count(&self) -> usize {
        self.state.lock().available.len()
    }

    /// True if the provider was excluded.
    pub fn is_excluded(&self, id: ProviderId) -> bool {
        id.0 < self.size && !self.state.lock().good.contains(&id)
    }

    /// Excluded providers in construction order.
    pub fn excluded(&self) -> Vec<ProviderId> {
        let st = self.state.lock();
        (0..self.size)
            .map(ProviderId)
            .filter(|p| !st.good.contains(p))
            .collect()
    }
}
