//! Runtime core: provider pool, bounded queue and the dispatcher facade.
//!
//! The only entry point from this module is [`Dispatcher`] (built through
//! [`DispatcherBuilder`]), which hands tasks to providers, retries, excludes
//! failing providers and tracks completion.
//!
//! Internal modules:
//! - [`pool`]: good/available partition and round-robin selection;
//! - [`queue`]: concurrency-bounded execution with a shrinking ceiling;
//! - [`runner`]: one assignment under the retry policy, with attempt events;
//! - [`dispatcher`]: submit/drain/kill and the bookkeeping tying the above together.

mod builder;
mod config;
mod dispatcher;
mod ids;
mod pool;
mod queue;
mod runner;

pub use builder::DispatcherBuilder;
pub use config::DispatcherConfig;
pub use dispatcher::Dispatcher;
pub use ids::{ProviderId, TaskId};
