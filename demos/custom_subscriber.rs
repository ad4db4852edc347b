//! # Example: custom_subscriber
//!
//! Demonstrates how to build and attach a custom event subscriber.
//!
//! Shows how to:
//! - Implement the [`Subscribe`] trait.
//! - Inspect [`Event`] / [`EventKind`] for per-provider counters.
//! - Wire the subscriber into [`Dispatcher::builder`].
//!
//! ## Flow
//! ```text
//! Dispatcher ── publish(Event) ──► Bus ──► subscriber listener
//!                                              └─► SubscriberSet.emit() ──► Stats.on_event()
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example custom_subscriber
//! ```

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use parking_lot::Mutex;
use provisor::{
    Dispatcher, DispatcherConfig, Event, EventKind, HandlerFn, HandlerRef, ProviderId, Subscribe,
    TaskError,
};

/// Per-provider outcome counters.
#[derive(Default, Debug)]
struct Counters {
    succeeded: u32,
    failed_attempts: u32,
    excluded: bool,
}

/// Collects counters from dispatcher events.
#[derive(Default)]
struct Stats {
    by_provider: Mutex<BTreeMap<ProviderId, Counters>>,
}

#[async_trait::async_trait]
impl Subscribe for Stats {
    async fn on_event(&self, ev: &Event) {
        let Some(provider) = ev.provider else {
            return;
        };
        let mut map = self.by_provider.lock();
        let c = map.entry(provider).or_default();
        match ev.kind {
            EventKind::TaskSucceeded => c.succeeded += 1,
            EventKind::AttemptFailed => c.failed_attempts += 1,
            EventKind::ProviderExcluded => c.excluded = true,
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "stats"
    }

    fn queue_capacity(&self) -> usize {
        4096
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let stats = Arc::new(Stats::default());

    // Even task numbers are flaky on the first attempt.
    let work: HandlerRef<u32, &'static str> = HandlerFn::arc({
        let seen = Arc::new(Mutex::new(std::collections::HashSet::new()));
        move |n: Arc<u32>, node: Arc<&'static str>| {
            let first_try = seen.lock().insert(*n);
            async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                if *n % 2 == 0 && first_try {
                    return Err(TaskError::fail(format!("{node}: flaky")));
                }
                Ok(())
            }
        }
    });

    let dispatcher = Dispatcher::builder(work, ["node-1", "node-2"])
        .with_config(DispatcherConfig {
            retry_wait: Duration::from_millis(25),
            ..DispatcherConfig::default()
        })
        .with_subscribers(vec![stats.clone() as Arc<dyn Subscribe>])
        .build()?;

    for n in 0..12 {
        dispatcher.submit(n).await?;
    }
    dispatcher.drain().await;
    // let the subscriber worker catch up
    tokio::time::sleep(Duration::from_millis(50)).await;

    for (id, c) in stats.by_provider.lock().iter() {
        let name = dispatcher.provider(*id).map(|p| **p).unwrap_or("?");
        println!("{name}: {c:?}");
    }
    Ok(())
}
