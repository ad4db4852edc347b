use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast::Receiver;
use tokio::time::{Instant, sleep};

use provisor::{
    DispatchError, Dispatcher, DispatcherConfig, Event, EventKind, HandlerFn, HandlerRef,
    ProviderId, Subscribe, TaskError,
};

fn cfg(attempts: u32, wait_ms: u64) -> DispatcherConfig {
    DispatcherConfig {
        attempts,
        retry_wait: Duration::from_millis(wait_ms),
        drain_poll: Duration::from_millis(5),
        ..DispatcherConfig::default()
    }
}

fn sleepy(ms: u64) -> HandlerRef<u32, &'static str> {
    HandlerFn::arc(move |_t: Arc<u32>, _p: Arc<&'static str>| async move {
        sleep(Duration::from_millis(ms)).await;
        Ok::<(), TaskError>(())
    })
}

fn failing_on(bad: &'static str, ms: u64) -> HandlerRef<u32, &'static str> {
    HandlerFn::arc(move |_t: Arc<u32>, p: Arc<&'static str>| async move {
        sleep(Duration::from_millis(ms)).await;
        if *p == bad {
            Err(TaskError::fail(format!("{bad} unreachable")))
        } else {
            Ok(())
        }
    })
}

fn collect(rx: &mut Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

fn count(events: &[Event], kind: EventKind) -> usize {
    events.iter().filter(|e| e.kind == kind).count()
}

#[tokio::test]
async fn test_empty_provider_list_is_rejected() {
    let res = Dispatcher::new(sleepy(1), Vec::<&'static str>::new());
    assert!(matches!(res, Err(DispatchError::EmptyProviderList)));
}

#[tokio::test(start_paused = true)]
async fn test_round_robin_alternates_between_providers() {
    let d = Dispatcher::builder(sleepy(10), ["A", "B"])
        .with_config(cfg(3, 10))
        .build()
        .expect("dispatcher");
    let mut rx = d.subscribe();

    for t in 0..4 {
        d.submit(t).await.expect("submit");
    }
    d.drain().await;

    let assigned: Vec<Option<ProviderId>> = collect(&mut rx)
        .into_iter()
        .filter(|e| e.kind == EventKind::ProviderAssigned)
        .map(|e| e.provider)
        .collect();
    let a = Some(ProviderId(0));
    let b = Some(ProviderId(1));
    assert_eq!(assigned, vec![a, b, a, b]);
}

#[tokio::test(start_paused = true)]
async fn test_failing_provider_is_excluded_and_concurrency_shrinks() {
    let d = Dispatcher::builder(failing_on("B", 10), ["A", "B", "C"])
        .with_config(cfg(3, 10))
        .build()
        .expect("dispatcher");
    let mut rx = d.subscribe();
    assert_eq!(d.concurrency_limit(), 3);

    for t in 0..5 {
        d.submit(t).await.expect("submit");
    }
    d.drain().await;

    let events = collect(&mut rx);
    assert_eq!(count(&events, EventKind::TaskSucceeded), 4);
    assert_eq!(count(&events, EventKind::TaskFailed), 1);
    assert_eq!(count(&events, EventKind::ProviderExcluded), 1);

    // B was attempted exactly three times within its single assignment.
    let b_attempts = events
        .iter()
        .filter(|e| e.kind == EventKind::AttemptStarting && e.provider == Some(ProviderId(1)))
        .count();
    assert_eq!(b_attempts, 3);
    let b_assignments = events
        .iter()
        .filter(|e| e.kind == EventKind::ProviderAssigned && e.provider == Some(ProviderId(1)))
        .count();
    assert_eq!(b_assignments, 1);

    let shrunk = events
        .iter()
        .find(|e| e.kind == EventKind::ConcurrencyShrunk)
        .and_then(|e| e.limit);
    assert_eq!(shrunk, Some(2));

    assert_eq!(d.excluded_providers(), vec![ProviderId(1)]);
    assert!(d.is_excluded(ProviderId(1)));
    assert!(!d.is_excluded(ProviderId(0)));
    assert_eq!(d.available_provider_count(), 2);
    assert_eq!(d.good_provider_count(), 2);
    assert_eq!(d.concurrency_limit(), d.good_provider_count());
    assert_eq!(d.unfinished_count(), 0);
    assert_eq!(d.running_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_excluded_provider_is_never_reused() {
    let d = Dispatcher::builder(failing_on("A", 1), ["A", "B"])
        .with_config(cfg(1, 0))
        .build()
        .expect("dispatcher");

    d.submit(0).await.expect("submit");
    d.drain().await;
    assert_eq!(d.excluded_providers(), vec![ProviderId(0)]);

    let mut rx = d.subscribe();
    for t in 1..6 {
        d.submit(t).await.expect("submit");
    }
    d.drain().await;

    let events = collect(&mut rx);
    assert!(
        events
            .iter()
            .filter(|e| e.kind == EventKind::ProviderAssigned)
            .all(|e| e.provider == Some(ProviderId(1)))
    );
    assert_eq!(count(&events, EventKind::TaskSucceeded), 5);
}

#[tokio::test(start_paused = true)]
async fn test_submit_fails_immediately_without_good_providers() {
    let d = Dispatcher::builder(failing_on("A", 1), ["A"])
        .with_config(cfg(1, 0))
        .build()
        .expect("dispatcher");

    d.submit(0).await.expect("submit");
    d.drain().await;
    assert_eq!(d.good_provider_count(), 0);
    assert_eq!(d.concurrency_limit(), 0);

    assert_eq!(d.submit(1).await, Err(DispatchError::NoGoodProviders));
    assert_eq!(d.unfinished_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_waiting_submit_fails_when_last_provider_is_excluded() {
    let d = Dispatcher::builder(failing_on("A", 10), ["A"])
        .with_config(cfg(1, 0))
        .build()
        .expect("dispatcher");

    d.submit(0).await.expect("submit");
    assert_eq!(d.submit(1).await, Err(DispatchError::NoGoodProviders));

    d.drain().await;
    assert_eq!(d.unfinished_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_drain_waits_for_every_submitted_task() {
    let done = Arc::new(AtomicUsize::new(0));
    let handler: HandlerRef<u32, &'static str> = HandlerFn::arc({
        let done = done.clone();
        move |_t: Arc<u32>, _p: Arc<&'static str>| {
            let done = done.clone();
            async move {
                sleep(Duration::from_millis(50)).await;
                done.fetch_add(1, Ordering::SeqCst);
                Ok::<(), TaskError>(())
            }
        }
    });
    let d = Dispatcher::builder(handler, ["A", "B"])
        .with_config(cfg(3, 10))
        .build()
        .expect("dispatcher");

    // nothing submitted yet
    d.drain().await;

    for t in 0..6 {
        d.submit(t).await.expect("submit");
    }
    sleep(Duration::from_millis(10)).await;
    assert_eq!(d.running_count(), 2);

    d.drain().await;
    assert_eq!(done.load(Ordering::SeqCst), 6);
    assert_eq!(d.running_count(), 0);
    assert_eq!(d.unfinished_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_retries_wait_between_attempts() {
    let d = Dispatcher::builder(failing_on("A", 0), ["A"])
        .with_config(cfg(3, 100))
        .build()
        .expect("dispatcher");
    let mut rx = d.subscribe();

    let start = Instant::now();
    d.submit(0).await.expect("submit");
    d.drain().await;
    assert!(start.elapsed() >= Duration::from_millis(200));

    let events = collect(&mut rx);
    assert_eq!(count(&events, EventKind::AttemptFailed), 3);
    assert_eq!(count(&events, EventKind::RetryScheduled), 2);
    let failed = events.iter().find(|e| e.kind == EventKind::TaskFailed);
    assert_eq!(failed.and_then(|e| e.attempt), Some(3));
    assert_eq!(
        failed.and_then(|e| e.reason.as_deref().map(str::to_owned)),
        Some("execution failed: A unreachable".to_owned())
    );
}

#[tokio::test(start_paused = true)]
async fn test_panicking_handler_excludes_provider() {
    let handler: HandlerRef<u32, &'static str> =
        HandlerFn::arc(|_t: Arc<u32>, p: Arc<&'static str>| async move {
            if *p == "A" {
                panic!("handler bug");
            }
            Ok::<(), TaskError>(())
        });
    let d = Dispatcher::builder(handler, ["A", "B"])
        .with_config(cfg(2, 1))
        .build()
        .expect("dispatcher");

    d.submit(0).await.expect("submit");
    d.submit(1).await.expect("submit");
    d.drain().await;

    assert_eq!(d.excluded_providers(), vec![ProviderId(0)]);
    assert_eq!(d.concurrency_limit(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_single_task_event_sequence() {
    let d = Dispatcher::builder(sleepy(1), ["A"])
        .with_config(cfg(3, 10))
        .build()
        .expect("dispatcher");
    let mut rx = d.subscribe();

    let id = d.submit(7).await.expect("submit");
    d.drain().await;

    let events = collect(&mut rx);
    let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::TaskSubmitted,
            EventKind::ProviderAssigned,
            EventKind::AttemptStarting,
            EventKind::TaskSucceeded,
            EventKind::Drained,
        ]
    );
    assert!(events[..4].iter().all(|e| e.task == Some(id)));
    assert!(events.windows(2).all(|w| w[0].seq < w[1].seq));
}

#[tokio::test(start_paused = true)]
async fn test_kill_stops_scheduling() {
    let d = Dispatcher::builder(sleepy(100), ["A"])
        .with_config(cfg(3, 10))
        .build()
        .expect("dispatcher");
    let mut rx = d.subscribe();

    d.submit(0).await.expect("submit");
    let waiting = tokio::spawn({
        let d = d.clone();
        async move { d.submit(1).await }
    });
    sleep(Duration::from_millis(5)).await;
    assert!(!waiting.is_finished());

    d.kill();
    assert!(d.is_killed());
    assert_eq!(waiting.await.ok(), Some(Err(DispatchError::Killed)));
    assert_eq!(d.submit(2).await, Err(DispatchError::Killed));

    // the running assignment is not aborted, but drain no longer waits for it
    assert_eq!(d.running_count(), 1);
    d.drain().await;
    assert_eq!(d.running_count(), 1);

    sleep(Duration::from_millis(200)).await;
    assert_eq!(d.running_count(), 0);

    let events = collect(&mut rx);
    assert_eq!(count(&events, EventKind::Killed), 1);
    assert_eq!(count(&events, EventKind::Drained), 0);
}

struct Recorder {
    seen: Arc<Mutex<Vec<EventKind>>>,
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, event: &Event) {
        self.seen.lock().push(event.kind);
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_observe_permanent_failures() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let d = Dispatcher::builder(failing_on("B", 1), ["A", "B"])
        .with_config(cfg(2, 1))
        .with_subscribers(vec![Arc::new(Recorder { seen: seen.clone() })])
        .build()
        .expect("dispatcher");

    d.submit(0).await.expect("submit");
    d.submit(1).await.expect("submit");
    d.drain().await;
    sleep(Duration::from_millis(10)).await;

    let seen = seen.lock();
    assert!(seen.contains(&EventKind::TaskFailed));
    assert!(seen.contains(&EventKind::ProviderExcluded));
    assert_eq!(seen.last(), Some(&EventKind::Drained));
}

#[tokio::test]
async fn test_inspection_reports_construction_state() {
    let d = Dispatcher::new(sleepy(1), ["A", "B", "C"]).expect("dispatcher");

    assert_eq!(d.providers().len(), 3);
    assert_eq!(d.provider(ProviderId(2)).map(|p| **p), Some("C"));
    assert!(d.provider(ProviderId(3)).is_none());
    assert_eq!(d.good_provider_count(), 3);
    assert_eq!(d.available_provider_count(), 3);
    assert_eq!(d.concurrency_limit(), 3);
    assert!(d.excluded_providers().is_empty());
    assert_eq!(d.config().attempts, 3);
    assert!(!d.is_killed());
}
