//! Batch-mode Elastic handler
//!
//! Like the generic batch handler, but the batch is flattened into
//! MetricElastic documents that are posted independently, each under the
//! limiter. String metrics are stripped before the conversion, so stripped
//! batches simply produce no string documents. The commit happens once,
//! after every document went through; any failure is fatal and leaves the
//! whole message uncommitted.

use dustdevil_wire::{MetricBatch, MetricElastic};

use crate::error::EngineError;
use crate::transport::Transport;

use super::WorkerContext;

impl WorkerContext {
    /// Forward one inbound MetricBatch as independent Elastic documents
    pub(crate) async fn process_elastic(&self, msg: Transport) {
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

        for doc in MetricElastic::from_batch(&batch) {
            let body = match serde_json::to_vec(&doc) {
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
        }

        self.delay.spawn(msg.commit());
    }
}
