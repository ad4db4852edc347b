//! # Handler abstraction.
//!
//! A [`Handler`] executes one task against one provider. The dispatcher calls it
//! once per attempt; failures are reported by returning [`TaskError`] rather
//! than a value.
//!
//! Both the task payload and the provider are handed over as `Arc`s so that an
//! implementation can move them into spawned work or keep them across awaits.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TaskError;

/// # Asynchronous task executor bound to a provider.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use provisor::{Handler, TaskError};
///
/// struct Endpoint { url: String }
/// struct FetchBlock;
///
/// #[async_trait]
/// impl Handler<u64, Endpoint> for FetchBlock {
///     async fn handle(&self, block: Arc<u64>, endpoint: Arc<Endpoint>) -> Result<(), TaskError> {
///         if endpoint.url.is_empty() {
///             return Err(TaskError::fail(format!("no url for block {block}")));
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<T, P>: Send + Sync + 'static
where
    T: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    /// Executes one attempt of `task` on `provider`.
    async fn handle(&self, task: Arc<T>, provider: Arc<P>) -> Result<(), TaskError>;
}

/// Shared handle to a handler (`Arc<dyn Handler<T, P>>`).
pub type HandlerRef<T, P> = Arc<dyn Handler<T, P>>;
