//! Retry policy.
//!
//! This module groups the knobs that control **how often** an assignment is
//! attempted against its provider and **how long** to wait between attempts.
//!
//! ## Contents
//! - [`RetryPolicy`] fixed attempt count + fixed delay
//! - [`retry`] free-function form
//!
//! ## Quick wiring
//! ```text
//! DispatcherConfig { attempts, retry_wait, .. }
//!      └─► DispatcherConfig::retry_policy()
//!           └─► core::runner::run_assignment uses RetryPolicy::execute_with
//! ```
//!
//! ## Defaults
//! - `RetryPolicy::default()` → attempts=3, wait=30s.

mod retry;

pub use retry::{RetryPolicy, retry};
