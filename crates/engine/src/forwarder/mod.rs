//! Forwarder worker
//!
//! The per-worker engine. Each worker owns a bounded input queue fed by the
//! dispatcher and runs one event loop:
//!
//! - shutdown cancellation jumps to the drain;
//! - in split mode, a periodic tick releases the assembly buffer;
//! - every input message is handed to a detached, delay-tracked handler for
//!   the configured wire format and output mode.
//!
//! After shutdown the worker keeps reading its input until the channel
//! closes, processing synchronously, then joins its detached tasks. That
//! ordering is what guarantees every queued message is either forwarded and
//! committed or left for redelivery - never silently dropped.
//!
//! Fatal errors follow one discipline everywhere: report on the shared
//! death channel, then block on the shutdown token so the failing task
//! cannot race ahead of the supervisor's teardown.

mod batch;
mod elastic;
mod split;

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use dustdevil_config::{Config, InputFormat};

use crate::assembly::AssemblyBuffer;
use crate::delay::DelayTracker;
use crate::error::EngineError;
use crate::http::MetricPoster;
use crate::limit::Limiter;
use crate::lookup::LookupClient;
use crate::metrics::ForwarderMetrics;
use crate::transport::Transport;

/// State shared between a worker's event loop and its detached handlers
pub(crate) struct WorkerContext {
    /// Worker index within the pool
    num: usize,

    /// Application identity for heartbeat relays
    application: String,

    config: Arc<Config>,
    poster: MetricPoster,
    limiter: Limiter,
    delay: DelayTracker,
    death: mpsc::Sender<EngineError>,
    shutdown: CancellationToken,
    metrics: Arc<ForwarderMetrics>,
    lookup: LookupClient,

    /// Split-mode accumulation state; the mutex serializes per-message
    /// ingestion against the periodic release on this worker
    assembly: Mutex<AssemblyBuffer>,
}

/// One worker of the pool
pub(crate) struct Forwarder {
    ctx: Arc<WorkerContext>,
    input: mpsc::Receiver<Transport>,
}

impl Forwarder {
    /// Set up a worker: HTTP client, heartbeat lookup, delay tracker,
    /// assembly lock
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        num: usize,
        config: Arc<Config>,
        input: mpsc::Receiver<Transport>,
        shutdown: CancellationToken,
        death: mpsc::Sender<EngineError>,
        limiter: Limiter,
        metrics: Arc<ForwarderMetrics>,
        lookup: LookupClient,
    ) -> Result<Self, EngineError> {
        let poster = MetricPoster::new(&config.forwarder)?;
        let application = config.misc.application();

        Ok(Self {
            ctx: Arc::new(WorkerContext {
                num,
                application,
                poster,
                limiter,
                delay: DelayTracker::new(),
                death,
                shutdown,
                metrics,
                lookup,
                assembly: Mutex::new(AssemblyBuffer::new()),
                config,
            }),
            input,
        })
    }

    /// The worker event loop
    pub(crate) async fn run(mut self) {
        let split_mode = self.ctx.config.forwarder.input_format == InputFormat::Split;
        let release_every = self.ctx.config.forwarder.release_interval();
        let mut release_tick = interval_at(Instant::now() + release_every, release_every);
        release_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        debug!(worker = self.ctx.num, split_mode, "forwarder worker started");

        loop {
            tokio::select! {
                _ = self.ctx.shutdown.cancelled() => break,
                _ = release_tick.tick(), if split_mode => {
                    let ctx = Arc::clone(&self.ctx);
                    let mut assembly = self.ctx.assembly.lock().await;
                    ctx.release(&mut assembly).await;
                }
                msg = self.input.recv() => match msg {
                    Some(msg) => {
                        self.ctx.metrics.mark_input();
                        let ctx = Arc::clone(&self.ctx);
                        self.ctx.delay.spawn(async move { ctx.handle(msg).await });
                    }
                    // input closed; shutdown is already underway
                    None => break,
                }
            }
        }

        // drain the input the supervisor will close, synchronously
        while let Some(msg) = self.input.recv().await {
            self.ctx.metrics.mark_input();
            Arc::clone(&self.ctx).handle(msg).await;
        }

        self.ctx.delay.close();
        self.ctx.delay.wait().await;
        debug!(worker = self.ctx.num, "forwarder worker stopped");
    }
}

impl WorkerContext {
    /// Per-message entry point
    pub(crate) async fn handle(self: Arc<Self>, msg: Transport) {
        // known-empty record: log, commit, advance past it
        if !msg.heartbeat && msg.value.as_deref().map_or(true, |v| v.is_empty()) {
            warn!(
                worker = self.num,
                host_id = msg.host_id,
                "ignoring empty message"
            );
            msg.commit().await;
            return;
        }

        // heartbeats are relayed to the lookup sidecar, never decoded
        if msg.heartbeat {
            let lookup = self.lookup.clone();
            let application = self.application.clone();
            let worker = self.num;
            let beat = msg.value.unwrap_or_default();
            self.delay.spawn(async move {
                lookup.heartbeat(&application, worker, beat).await;
            });
            return;
        }

        match (
            self.config.forwarder.input_format,
            self.config.forwarder.forward_elastic,
        ) {
            (InputFormat::Split, _) => self.assemble_split(msg).await,
            (InputFormat::Batch, false) => self.process_batch(msg).await,
            (InputFormat::Batch, true) => self.process_elastic(msg).await,
        }
    }

    /// Report a fatal error without blocking teardown
    ///
    /// The supervisor surfaces only the first error; a full or closed death
    /// channel means teardown is already underway.
    pub(crate) fn report_fatal(&self, err: EngineError) {
        use mpsc::error::TrySendError;

        if let Err(e) = self.death.try_send(err) {
            let (TrySendError::Full(err) | TrySendError::Closed(err)) = e;
            warn!(
                worker = self.num,
                error = %err,
                "death channel unavailable, error dropped"
            );
        }
    }

    /// Report a fatal error, then hold until the supervisor tears down
    pub(crate) async fn fatal(&self, err: EngineError) {
        self.report_fatal(err);
        self.shutdown.cancelled().await;
    }
}
