//! # Function-backed handler (`HandlerFn`)
//!
//! [`HandlerFn`] wraps a closure `F: Fn(Arc<T>, Arc<P>) -> Fut`, producing a fresh
//! future per attempt. No state is shared between attempts unless the closure
//! captures it explicitly (e.g. an `Arc<AtomicUsize>`).
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use provisor::{HandlerFn, HandlerRef, TaskError};
//!
//! let h: HandlerRef<String, &'static str> =
//!     HandlerFn::arc(|task: Arc<String>, provider: Arc<&'static str>| async move {
//!         if task.is_empty() {
//!             return Err(TaskError::fail(format!("{provider}: empty task")));
//!         }
//!         Ok(())
//!     });
//! # let _ = h;
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TaskError;
use crate::handlers::handler::Handler;

/// Function-backed handler implementation.
#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F> HandlerFn<F> {
    /// Creates a new function-backed handler.
    ///
    /// Prefer [`HandlerFn::arc`] when you immediately need a [`HandlerRef`](crate::HandlerRef).
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut, T, P> Handler<T, P> for HandlerFn<F>
where
    F: Fn(Arc<T>, Arc<P>) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    T: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    async fn handle(&self, task: Arc<T>, provider: Arc<P>) -> Result<(), TaskError> {
        (self.f)(task, provider).await
    }
}
