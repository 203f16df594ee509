//! Pool supervisor
//!
//! Owns the process lifecycle: start the metrics sidecar, the shared
//! limiter, N forwarder workers, and the consumer - in that order - then
//! supervise until a shutdown signal, an external cancellation, or the
//! first fatal error.
//!
//! The teardown ordering is non-negotiable: the consumer writes to the
//! worker input channels, so those channels may only be closed after the
//! consumer task has fully exited. Workers then drain whatever is still
//! queued, and the delay tracker joins every detached task before the
//! supervisor returns.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::sync::mpsc;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use dustdevil_config::Config;

use crate::consumer::Consumer;
use crate::delay::DelayTracker;
use crate::dispatch::Dispatcher;
use crate::error::EngineError;
use crate::forwarder::Forwarder;
use crate::limit::Limiter;
use crate::lookup::LookupClient;
use crate::metrics::{ForwarderMetrics, MetricsReporter};
use crate::transport::Transport;

/// Cadence of heartbeat Transports posted to every worker
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// Idle window for draining late errors during teardown
const ERROR_DRAIN_WINDOW: Duration = Duration::from_millis(10);

/// Worker pool supervisor
pub struct Pool {
    config: Arc<Config>,
    metrics: Arc<ForwarderMetrics>,
}

impl Pool {
    /// Create a pool over the given configuration
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            metrics: Arc::new(ForwarderMetrics::new()),
        }
    }

    /// The pool's shared message meters
    pub fn metrics(&self) -> Arc<ForwarderMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run the pool until SIGINT/SIGTERM, `shutdown` cancellation, or the
    /// first fatal error
    ///
    /// Returns the fatal error if the pool died; the process should exit
    /// non-zero in that case.
    pub async fn run<C: Consumer>(
        self,
        consumer: C,
        shutdown: CancellationToken,
    ) -> Result<(), EngineError> {
        let forwarder_config = &self.config.forwarder;
        let workers = forwarder_config.effective_workers();

        let delay = DelayTracker::new();

        // metrics sidecar
        let (sidecar_err_tx, mut sidecar_err_rx) = mpsc::channel(8);
        let sidecar_cancel = CancellationToken::new();
        if self.config.misc.produce_metrics {
            let reporter = MetricsReporter::new(
                &self.config,
                Arc::clone(&self.metrics),
                sidecar_err_tx.clone(),
            );
            let cancel = sidecar_cancel.clone();
            delay.spawn(async move { reporter.run(cancel).await });
            info!("launched metrics sidecar");
        }
        drop(sidecar_err_tx);

        // shared request limiter and sidecar clients
        let limiter = Limiter::new(forwarder_config.concurrency_limit);
        let lookup = LookupClient::new(&self.config.lookup);

        let (death_tx, mut death_rx) = mpsc::channel(workers + 2);

        // workers
        let mut inputs = Vec::with_capacity(workers);
        let mut worker_shutdowns = Vec::with_capacity(workers);
        for num in 0..workers {
            let (input_tx, input_rx) = mpsc::channel(forwarder_config.handler_queue_length);
            let worker_shutdown = CancellationToken::new();

            let worker = Forwarder::new(
                num,
                Arc::clone(&self.config),
                input_rx,
                worker_shutdown.clone(),
                death_tx.clone(),
                limiter.clone(),
                Arc::clone(&self.metrics),
                lookup.clone(),
            )?;
            delay.spawn(worker.run());

            inputs.push(input_tx);
            worker_shutdowns.push(worker_shutdown);
            info!(worker = num, "launched forwarder worker");
        }

        // consumer
        let dispatcher = Dispatcher::new(inputs.clone());
        let consumer_shutdown = CancellationToken::new();
        let consumer_task = delay.spawn(consumer.run(
            dispatcher,
            consumer_shutdown.clone(),
            death_tx.clone(),
        ));
        drop(death_tx);

        info!(
            workers,
            endpoint = %forwarder_config.endpoint,
            concurrency_limit = forwarder_config.concurrency_limit,
            "dustdevil pool running"
        );

        let mut heartbeat = interval_at(
            Instant::now() + HEARTBEAT_INTERVAL,
            HEARTBEAT_INTERVAL,
        );
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let signal = wait_for_signal();
        tokio::pin!(signal);

        let mut fault: Option<EngineError> = None;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("received shutdown request");
                    break;
                }
                _ = &mut signal => {
                    info!("received shutdown signal");
                    break;
                }
                Some(err) = sidecar_err_rx.recv() => {
                    error!(error = %err, "metrics sidecar error");
                }
                Some(err) = death_rx.recv() => {
                    error!(error = %err, "worker died");
                    fault = Some(err);
                    break;
                }
                _ = heartbeat.tick() => {
                    // never block the supervisor on a full worker queue
                    for input in &inputs {
                        let input = input.clone();
                        delay.spawn(async move {
                            let _ = input.send(Transport::heartbeat()).await;
                        });
                    }
                }
            }
        }

        // stop the sidecar and the consumer
        sidecar_cancel.cancel();
        consumer_shutdown.cancel();

        // input channels must stay open until the consumer has exited
        if let Err(e) = consumer_task.await {
            warn!(error = %e, "consumer task failed");
        }

        // now close each worker's shutdown, then its input
        for worker_shutdown in &worker_shutdowns {
            worker_shutdown.cancel();
        }
        drop(inputs);

        // read whatever else died while tearing down
        loop {
            tokio::select! {
                _ = sleep(ERROR_DRAIN_WINDOW) => break,
                Some(err) = death_rx.recv() => {
                    error!(error = %err, "worker died during teardown");
                }
                Some(err) = sidecar_err_rx.recv() => {
                    error!(error = %err, "metrics sidecar error");
                }
            }
        }

        // join workers, consumer, sidecar, and every detached task
        delay.close();
        delay.wait().await;

        info!("dustdevil shutdown complete");

        match fault {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
