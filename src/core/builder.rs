use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{DispatcherConfig, dispatcher::Dispatcher},
    error::DispatchError,
    events::Bus,
    handlers::HandlerRef,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Dispatcher`] with optional features.
pub struct DispatcherBuilder<T, P>
where
    T: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    cfg: DispatcherConfig,
    handler: HandlerRef<T, P>,
    providers: Vec<Arc<P>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl<T, P> DispatcherBuilder<T, P>
where
    T: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    /// Creates a new builder over the given handler and providers.
    pub fn new(handler: HandlerRef<T, P>, providers: impl IntoIterator<Item = P>) -> Self {
        Self {
            cfg: DispatcherConfig::default(),
            handler,
            providers: providers.into_iter().map(Arc::new).collect(),
            subscribers: Vec::new(),
        }
    }

    /// Replaces the default configuration.
    pub fn with_config(mut self, cfg: DispatcherConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (assignments, retries, exclusions)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds and returns the dispatcher.
    ///
    /// Fails with [`DispatchError::EmptyProviderList`] if no provider was given.
    /// Must be called from within a tokio runtime when subscribers are set.
    pub fn build(self) -> Result<Arc<Dispatcher<T, P>>, DispatchError> {
        if self.providers.is_empty() {
            return Err(DispatchError::EmptyProviderList);
        }

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let listener_token = CancellationToken::new();

        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        if !subs.is_empty() {
            tracing::debug!(subscribers = subs.len(), "starting subscriber listener");
            subscriber_listener(&bus, subs, listener_token.clone());
        }

        Ok(Arc::new(Dispatcher::new_internal(
            self.cfg,
            self.handler,
            self.providers,
            bus,
            listener_token,
        )))
    }
}

/// Forwards bus events to the subscriber set until `token` is cancelled.
///
/// Subscriber diagnostics are not fed back to subscribers.
fn subscriber_listener(bus: &Bus, subs: SubscriberSet, token: CancellationToken) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            let ev = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                res = rx.recv() => res,
            };
            match ev {
                Ok(ev) if ev.is_subscriber_event() => {}
                Ok(ev) => subs.emit(&ev),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "subscriber listener lagged behind the bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
        subs.shutdown().await;
    });
}
