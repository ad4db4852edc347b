//! # Example: basic_dispatch
//!
//! Fans a batch of uploads out over three gateways and waits for all of them.
//!
//! Shows how to:
//! - Wrap a closure as a handler with [`HandlerFn`].
//! - Build a [`Dispatcher`] with the built-in [`LogWriter`] subscriber.
//! - Throttle progress output with a [`Ticker`].
//!
//! ## Flow
//! ```text
//! for file in files:
//!     submit(file) ──► round robin gw-a, gw-b, gw-c ──► upload()
//!     ticker.tick(now) ──► print progress (at most every 100ms)
//! drain()
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=provisor=debug cargo run --example basic_dispatch
//! ```

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use provisor::{
    Dispatcher, DispatcherConfig, HandlerFn, HandlerRef, LogWriter, Subscribe, TaskError, Ticker,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let upload: HandlerRef<String, &'static str> =
        HandlerFn::arc(|file: Arc<String>, gateway: Arc<&'static str>| async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            if file.is_empty() {
                return Err(TaskError::fail(format!("{gateway}: empty file name")));
            }
            println!("[upload] {file} via {gateway}");
            Ok(())
        });

    let cfg = DispatcherConfig {
        retry_wait: Duration::from_millis(200),
        ..DispatcherConfig::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];

    let dispatcher = Dispatcher::builder(upload, ["gw-a", "gw-b", "gw-c"])
        .with_config(cfg)
        .with_subscribers(subs)
        .build()?;

    let files: Vec<String> = (0..20).map(|i| format!("blob-{i:02}.json")).collect();
    let total = files.len();
    let mut ticker = Ticker::new(Duration::from_millis(100), None);

    for (i, file) in files.into_iter().enumerate() {
        dispatcher.submit(file).await?;
        if ticker.tick(Instant::now()) {
            println!(
                "[progress] submitted {}/{total}, running {}",
                i + 1,
                dispatcher.running_count()
            );
        }
    }

    dispatcher.drain().await;
    println!(
        "[done] unfinished={} running={}",
        dispatcher.unfinished_count(),
        dispatcher.running_count()
    );
    Ok(())
}
