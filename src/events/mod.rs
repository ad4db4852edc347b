//! Dispatcher events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the dispatcher, the queue and the
//! per-assignment runner.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Dispatcher`, `runner::run_assignment`,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the subscriber listener (fans out to `SubscriberSet`) and
//!   any receiver handed out by `Dispatcher::subscribe()`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
