//! # Event subscribers for the dispatcher.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and
//! built-in implementations for handling events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Dispatcher/runner ── publish(Event) ──► Bus ──► subscriber_listener
//!                                                          │
//!                                                          ▼
//!                                                    SubscriberSet::emit(&Event)
//!                                                   ┌──────┴──────┬─────────┐
//!                                                   ▼             ▼         ▼
//!                                               LogWriter      Metrics    Custom
//! ```
//!
//! Subscribers are the opt-in way to observe per-task outcomes: `submit()` never
//! reports permanent failure, `EventKind::TaskFailed` does.

#[cfg(feature = "logging")]
mod embedded;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
