//! # Handler abstractions.
//!
//! - [`Handler`] - trait executing one task attempt against one provider
//! - [`HandlerFn`] - closure-backed implementation
//! - [`HandlerRef`] - shared reference to a handler (`Arc<dyn Handler<T, P>>`)

mod handler;
mod handler_fn;

pub use handler::{Handler, HandlerRef};
pub use handler_fn::HandlerFn;
