//! Split-mode handlers
//!
//! Per-message ingestion absorbs fragments into the worker's assembly
//! buffer; the periodic release cycle turns every accumulated host into one
//! MetricBatch, fans the POSTs out in parallel, and commits each host's
//! pending Transports once its batch went through. A failed host keeps its
//! state and its uncommitted Transports - at-least-once delivery means the
//! log will bring the fragments back.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error};

use dustdevil_wire::{MetricBatch, MetricElastic, MetricSplit};

use crate::assembly::AssemblyBuffer;
use crate::error::EngineError;
use crate::transport::Transport;

use super::WorkerContext;

impl WorkerContext {
    /// Absorb one split fragment into the assembly buffer
    pub(crate) async fn assemble_split(&self, msg: Transport) {
        let payload = msg.value.as_deref().unwrap_or_default();
        let split: MetricSplit = match serde_json::from_slice(payload) {
            Ok(split) => split,
            Err(e) => {
                self.fatal(EngineError::Decode(e)).await;
                return;
            }
        };

        let strip = self.config.forwarder.strip_string_metrics;
        let stripped = {
            let mut assembly = self.assembly.lock().await;
            assembly.absorb(msg, &split, strip)
        };

        // a stripped string fragment contributes nothing; commit right away
        if let Some(msg) = stripped {
            self.delay.spawn(msg.commit());
        }
    }

    /// Forward every accumulated host batch, then reset the released hosts
    ///
    /// The caller holds the assembly lock for the whole cycle. POSTs fan
    /// out in parallel and are joined locally; only the first failure is
    /// reported to the supervisor, and a failed cycle ends by holding on
    /// the shutdown token like any other fatal path.
    pub(crate) async fn release(self: Arc<Self>, buffer: &mut AssemblyBuffer) {
        let hosts = buffer.host_ids();
        if hosts.is_empty() {
            return;
        }

        debug!(
            worker = self.num,
            hosts = hosts.len(),
            "releasing assembled batches"
        );

        let mut posts = JoinSet::new();
        for host_id in hosts {
            let batch = buffer.batch_for(host_id);
            let ctx = Arc::clone(&self);
            posts.spawn(async move {
                let result = match batch {
                    Some(batch) => ctx.post_assembled(batch).await,
                    None => Ok(()),
                };
                (host_id, result)
            });
        }

        let mut failed = false;
        while let Some(joined) = posts.join_next().await {
            let (host_id, result) = match joined {
                Ok(entry) => entry,
                Err(e) => {
                    error!(worker = self.num, error = %e, "release task failed");
                    if !failed {
                        self.report_fatal(EngineError::Release(e.to_string()));
                        failed = true;
                    }
                    continue;
                }
            };

            match result {
                Ok(()) => {
                    for msg in buffer.complete(host_id) {
                        self.delay.spawn(msg.commit());
                    }
                }
                Err(e) => {
                    if !failed {
                        self.report_fatal(e);
                        failed = true;
                    }
                }
            }
        }

        if failed {
            self.shutdown.cancelled().await;
        }
    }

    /// POST one reassembled host batch, generic or Elastic per config
    async fn post_assembled(&self, batch: MetricBatch) -> Result<(), EngineError> {
        if self.config.forwarder.forward_elastic {
            for doc in MetricElastic::from_batch(&batch) {
                let body = serde_json::to_vec(&doc).map_err(EngineError::Encode)?;

                let permit = self.limiter.acquire().await;
                let posted = self.poster.post(body).await;
                drop(permit);
                posted?;

                self.metrics.mark_output();
            }
            return Ok(());
        }

        let body = serde_json::to_vec(&batch).map_err(EngineError::Encode)?;

        let permit = self.limiter.acquire().await;
        let posted = self.poster.post(body).await;
        drop(permit);
        posted?;

        self.metrics.mark_output();
        Ok(())
    }
}
