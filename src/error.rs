//! Error types used by the dispatcher runtime and its handlers.
//!
//! This module defines two main error enums:
//!
//! - [`DispatchError`] errors surfaced to callers of the dispatcher itself.
//! - [`TaskError`] errors raised by a single handler attempt.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//!
//! Permanent per-task failure (retry budget exhausted) is **not** an error of
//! [`Dispatcher::submit`](crate::Dispatcher::submit): it is absorbed into pool
//! bookkeeping, logged, and published on the event bus.

use std::fmt::Display;

use thiserror::Error;

/// # Errors produced by the dispatcher.
///
/// Only configuration and resource-exhaustion failures ever reach the caller.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// The dispatcher was constructed without any provider.
    #[error("no providers")]
    EmptyProviderList,

    /// Every provider has been excluded; nothing can run any more.
    #[error("no good providers any more")]
    NoGoodProviders,

    /// [`Dispatcher::kill`](crate::Dispatcher::kill) was called; scheduling is stopped.
    #[error("dispatcher killed")]
    Killed,
}

impl DispatchError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use provisor::DispatchError;
    ///
    /// assert_eq!(DispatchError::NoGoodProviders.as_label(), "dispatch_no_good_providers");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::EmptyProviderList => "dispatch_empty_provider_list",
            DispatchError::NoGoodProviders => "dispatch_no_good_providers",
            DispatchError::Killed => "dispatch_killed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            DispatchError::EmptyProviderList => {
                "dispatcher requires at least one provider".to_string()
            }
            DispatchError::NoGoodProviders => {
                "all providers were excluded after exhausting retries".to_string()
            }
            DispatchError::Killed => "dispatcher no longer schedules assignments".to_string(),
        }
    }
}

/// # Errors produced by a single handler attempt.
///
/// Every variant is retried by the [`RetryPolicy`](crate::RetryPolicy) until the
/// attempt budget runs out.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Handler attempt failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Handler panicked while running the attempt.
    #[error("handler panicked: {info}")]
    Panicked {
        /// Panic payload, if it was a string.
        info: String,
    },
}

impl TaskError {
    /// Shorthand for [`TaskError::Fail`] from anything printable.
    ///
    /// # Example
    /// ```
    /// use provisor::TaskError;
    ///
    /// let err = TaskError::fail("rpc timeout");
    /// assert_eq!(err.to_string(), "execution failed: rpc timeout");
    /// ```
    pub fn fail(error: impl Display) -> Self {
        TaskError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Panicked { .. } => "task_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::Panicked { info } => format!("panic: {info}"),
        }
    }
}

/// Extracts a printable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
