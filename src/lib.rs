//! # provisor
//!
//! **Provisor** is a bounded-concurrency task dispatcher over a pool of
//! interchangeable providers (RPC endpoints, gateways, workers).
//!
//! Each submitted task is paired with the next available provider in round-robin
//! order and handed to a user [`Handler`]. Failed attempts are retried on the same
//! provider with a fixed pause; a provider that exhausts the retry budget is
//! excluded for good and the concurrency ceiling shrinks with it.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │    task #1   │   │    task #2   │   │    task #3   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            └────────── submit(task) ─────────────┘
//!                               ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Dispatcher                                                       │
//! │  - ProviderPool    (good / available / excluded, round robin)     │
//! │  - AssignmentQueue (concurrency ceiling, shrinks on exclusion)    │
//! │  - unfinished set  (drain() completes when it is empty)           │
//! │  - Bus             (broadcast events)                             │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!  ┌────────────┐     ┌────────────┐     ┌────────────┐        │
//!  │ assignment │     │ assignment │     │ assignment │        │
//!  │ (task, A)  │     │ (task, B)  │     │ (task, C)  │        │
//!  │ RetryPolicy│     │ RetryPolicy│     │ RetryPolicy│        │
//!  └─────┬──────┘     └─────┬──────┘     └─────┬──────┘        │
//!        ▼                  ▼                  ▼               ▼
//!     Handler::handle(task, provider)                 SubscriberSet
//!        │                                            (LogWriter, custom)
//!        ├─ Ok            → provider back to available
//!        └─ budget spent  → provider excluded, ceiling = good providers
//! ```
//!
//! ### Assignment lifecycle
//! ```text
//! TaskSubmitted ─► ProviderAssigned ─► AttemptStarting ─► handler
//!                                            ▲               │
//!                                            │        ┌──────┴──────┐
//!                                  RetryScheduled    Ok            Err
//!                                     (sleep wait)    │       AttemptFailed
//!                                            ▲        ▼             │
//!                                            │  TaskSucceeded       │
//!                                            └── attempts left ◄────┤
//!                                                                   ▼
//!                                           ProviderExcluded ─► ConcurrencyShrunk ─► TaskFailed
//! ```
//!
//! ## Features
//! | Area              | Description                                                        | Key types / traits                        |
//! |-------------------|--------------------------------------------------------------------|-------------------------------------------|
//! | **Dispatch**      | Submit tasks, drain, kill, inspect the pool.                       | [`Dispatcher`], [`DispatcherBuilder`]     |
//! | **Handlers**      | Per-attempt user work as a trait object or a closure.              | [`Handler`], [`HandlerFn`], [`HandlerRef`]|
//! | **Policies**      | Fixed attempts with a fixed wait, usable standalone.               | [`RetryPolicy`], [`retry`]                |
//! | **Subscriber API**| Hook into dispatcher events (logging, metrics, custom subscribers).| [`Subscribe`], [`Event`], [`EventKind`]   |
//! | **Errors**        | Typed errors for dispatching and handler attempts.                 | [`DispatchError`], [`TaskError`]          |
//! | **Configuration** | Centralize runtime settings.                                       | [`DispatcherConfig`]                      |
//! | **Throttling**    | Gate progress reporting to once per interval.                      | [`Ticker`]                                |
//!
//! ## Optional features
//! - `logging` (default): exports the built-in [`LogWriter`] subscriber that
//!   renders events through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use provisor::{Dispatcher, DispatcherConfig, HandlerFn, HandlerRef, TaskError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = DispatcherConfig {
//!         attempts: 3,
//!         retry_wait: Duration::from_millis(5),
//!         ..DispatcherConfig::default()
//!     };
//!
//!     // Build subscribers (optional)
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn provisor::Subscribe>> = vec![Arc::new(provisor::LogWriter::default())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn provisor::Subscribe>> = Vec::new();
//!
//!     let upload: HandlerRef<String, &'static str> =
//!         HandlerFn::arc(|file: Arc<String>, gateway: Arc<&'static str>| async move {
//!             if file.is_empty() {
//!                 return Err(TaskError::fail(format!("{gateway}: empty file")));
//!             }
//!             Ok(())
//!         });
//!
//!     let dispatcher = Dispatcher::builder(upload, ["gw-a", "gw-b"])
//!         .with_config(cfg)
//!         .with_subscribers(subs)
//!         .build()?;
//!
//!     for name in ["a.json", "b.json", "c.json"] {
//!         dispatcher.submit(name.to_string()).await?;
//!     }
//!     dispatcher.drain().await;
//!     assert_eq!(dispatcher.unfinished_count(), 0);
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod handlers;
mod policies;
mod subscribers;
mod ticker;

// ---- Public re-exports ----

pub use core::{Dispatcher, DispatcherBuilder, DispatcherConfig, ProviderId, TaskId};
pub use error::{DispatchError, TaskError};
pub use events::{Event, EventKind};
pub use handlers::{Handler, HandlerFn, HandlerRef};
pub use policies::{RetryPolicy, retry};
pub use subscribers::Subscribe;
pub use ticker::Ticker;

// Optional: expose a simple built-in logger subscriber.
// Enable with: `--features logging` (on by default)
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
