use super::event::TriggerEvent;
use super::router::TriggerRouter;
use crate::services::metrics;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub queue_size: usize,
    pub initial_retry_interval: Duration,
    /// Failed invocations are retried until this much time has passed.
    /// Zero disables retries.
    pub max_retry_elapsed: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_size: 1024,
            initial_retry_interval: Duration::from_millis(500),
            max_retry_elapsed: Duration::from_secs(60),
        }
    }
}

/// Runs every trigger event as its own task.
///
/// Invocations for the same due may overlap; both handlers recompute from
/// stored state so no ordering between them is enforced.
pub struct TriggerDispatcher {
    config: DispatchConfig,
    router: TriggerRouter,
    event_tx: mpsc::Sender<TriggerEvent>,
    event_rx: mpsc::Receiver<TriggerEvent>,
    shutdown_token: CancellationToken,
}

impl TriggerDispatcher {
    pub fn new(config: DispatchConfig, router: TriggerRouter) -> Self {
        let (event_tx, event_rx) = mpsc::channel(config.queue_size.max(1));

        Self {
            config,
            router,
            event_tx,
            event_rx,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Producer handle. Obtain before calling [`run`](Self::run); the loop
    /// ends once every sender is dropped.
    pub fn sender(&self) -> mpsc::Sender<TriggerEvent> {
        self.event_tx.clone()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Consume events until the queue closes or shutdown is requested. Events
    /// already queued at that point still run, and the call returns once every
    /// invocation has finished.
    pub async fn run(self) {
        let Self {
            config,
            router,
            event_tx,
            mut event_rx,
            shutdown_token,
        } = self;
        drop(event_tx);

        tracing::info!(queue_size = config.queue_size, "Trigger dispatcher started");

        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown_token.cancelled() => {
                    tracing::info!("Trigger dispatcher shutting down");
                    break;
                }
                event = event_rx.recv() => {
                    match event {
                        Some(event) => spawn_invocation(&mut in_flight, &router, &config, event),
                        None => {
                            tracing::info!("Trigger queue closed, dispatcher exiting");
                            break;
                        }
                    }
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "Trigger invocation task panicked");
                    }
                }
            }
        }

        // Refuse new events but still run the ones already queued.
        event_rx.close();
        while let Some(event) = event_rx.recv().await {
            spawn_invocation(&mut in_flight, &router, &config, event);
        }

        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Trigger invocation task panicked");
            }
        }

        tracing::info!("Trigger dispatcher stopped");
    }
}

fn spawn_invocation(
    in_flight: &mut JoinSet<()>,
    router: &TriggerRouter,
    config: &DispatchConfig,
    event: TriggerEvent,
) {
    tracing::debug!(kind = event.kind(), path = %event.path(), "Dispatching trigger");
    let router = router.clone();
    let config = config.clone();
    in_flight.spawn(async move {
        invoke(&router, &config, event).await;
    });
}

/// Run one invocation, retrying with exponential backoff. Retrying is safe:
/// fan-out batches are all-or-nothing and aggregation recomputes from source.
async fn invoke(router: &TriggerRouter, config: &DispatchConfig, event: TriggerEvent) {
    let backoff = ExponentialBackoff {
        initial_interval: config.initial_retry_interval,
        current_interval: config.initial_retry_interval,
        max_elapsed_time: Some(config.max_retry_elapsed),
        ..Default::default()
    };

    let mut attempt = 0_u32;
    let result = retry(backoff, || {
        attempt += 1;
        let attempt = attempt;
        let event = &event;
        async move {
            if attempt > 1 {
                metrics::record_retry(event.kind());
            }
            router.route(event).await.map_err(|e| {
                tracing::warn!(
                    kind = event.kind(),
                    path = %event.path(),
                    attempt,
                    error = %e,
                    "Trigger invocation failed"
                );
                backoff::Error::transient(e)
            })
        }
    })
    .await;

    if let Err(e) = result {
        tracing::error!(
            kind = event.kind(),
            path = %event.path(),
            error = %e,
            "Trigger invocation failed after retries"
        );
    }
}
