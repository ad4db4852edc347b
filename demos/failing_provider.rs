//! # Example: failing_provider
//!
//! One of three RPC endpoints is down. Its assignment is retried, the endpoint is
//! excluded and the dispatcher keeps going on the remaining two with a lower
//! concurrency ceiling.
//!
//! ## Flow
//! ```text
//! submit(block) ──► rpc-b ──► fail ──► retry (wait) ──► fail ──► retry ──► fail
//!                                                                     │
//!                      ProviderExcluded ◄─────────────────────────────┘
//!                      ConcurrencyShrunk (3 → 2)
//!                      TaskFailed (observed through subscribe())
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=warn cargo run --example failing_provider
//! ```

use std::{sync::Arc, time::Duration};

use provisor::{Dispatcher, DispatcherConfig, EventKind, HandlerFn, HandlerRef, TaskError};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let fetch: HandlerRef<u64, String> =
        HandlerFn::arc(|block: Arc<u64>, rpc: Arc<String>| async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if rpc.as_str() == "rpc-b" {
                return Err(TaskError::fail(format!("{rpc}: connection refused")));
            }
            println!("[fetch] block {block} from {rpc}");
            Ok(())
        });

    let dispatcher = Dispatcher::builder(
        fetch,
        ["rpc-a", "rpc-b", "rpc-c"].map(String::from),
    )
    .with_config(DispatcherConfig {
        attempts: 3,
        retry_wait: Duration::from_millis(100),
        ..DispatcherConfig::default()
    })
    .build()?;

    let mut events = dispatcher.subscribe();
    let watcher = tokio::spawn(async move {
        while let Ok(ev) = events.recv().await {
            match ev.kind {
                EventKind::TaskFailed => println!(
                    "[event] {} failed after {} attempts: {}",
                    ev.task.map(|t| t.to_string()).unwrap_or_default(),
                    ev.attempt.unwrap_or(0),
                    ev.reason.as_deref().unwrap_or("<none>")
                ),
                EventKind::ConcurrencyShrunk => {
                    println!("[event] concurrency is now {}", ev.limit.unwrap_or(0));
                }
                EventKind::Drained => break,
                _ => {}
            }
        }
    });

    for block in 1_000..1_010u64 {
        dispatcher.submit(block).await?;
    }
    dispatcher.drain().await;
    let _ = watcher.await;

    for id in dispatcher.excluded_providers() {
        let name = dispatcher.provider(id).map(|p| p.as_str()).unwrap_or("?");
        println!("[done] excluded {id} ({name})");
    }
    println!(
        "[done] good={} concurrency={}",
        dispatcher.good_provider_count(),
        dispatcher.concurrency_limit()
    );
    Ok(())
}
