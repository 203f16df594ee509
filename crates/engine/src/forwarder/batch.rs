//! Batch-mode handler
//!
//! Decode, optionally strip string metrics, re-encode, POST under the
//! shared limiter, commit on success. Any decode, encode, transport, or
//! status failure is fatal to the pool - the message stays uncommitted and
//! the upstream log redelivers it.

use dustdevil_wire::MetricBatch;

use crate::error::EngineError;
use crate::transport::Transport;

use super::WorkerContext;

impl WorkerContext {
    /// Forward one inbound MetricBatch as-is
    pub(crate) async fn process_batch(&self, msg: Transport) {
        let payload = msg.value.as_deref().unwrap_or_default();
        let mut batch: MetricBatch = match serde_json::from_slice(payload) {
            Ok(batch) => batch,
            Err(e) => {
                self.fatal(EngineError::Decode(e)).await;
                return;
            }
        };

        if self.config.forwarder.strip_string_metrics {
            batch.strip_string_metrics();
        }

        let body = match serde_json::to_vec(&batch) {
            Ok(body) => body,
            Err(e) => {
                self.fatal(EngineError::Encode(e)).await;
                return;
            }
        };

        let permit = self.limiter.acquire().await;
        let posted = self.poster.post(body).await;
        drop(permit);

        if let Err(e) = posted {
            self.fatal(e.into()).await;
            return;
        }

        self.metrics.mark_output();
        self.delay.spawn(msg.commit());
    }
}
