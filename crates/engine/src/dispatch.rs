//! Dispatcher
//!
//! Routes inbound Transports onto worker input queues. The worker index is
//! a stable hash of the partition, so every message of one partition lands
//! on the same worker, in arrival order - which both preserves per-partition
//! ordering and confines per-host assembly state to a single worker.
//!
//! `dispatch` awaits when the destination queue is full; that backpressure
//! propagates to the consumer, which simply stops polling the upstream log.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tokio::sync::mpsc;

use crate::error::EngineError;
use crate::transport::Transport;

/// Partition-stable router onto worker input queues
#[derive(Debug, Clone)]
pub struct Dispatcher {
    inputs: Vec<mpsc::Sender<Transport>>,
}

impl Dispatcher {
    /// Create a dispatcher over the workers' input senders
    ///
    /// # Panics
    ///
    /// Panics if `inputs` is empty.
    pub fn new(inputs: Vec<mpsc::Sender<Transport>>) -> Self {
        assert!(!inputs.is_empty(), "dispatcher requires at least one worker");
        Self { inputs }
    }

    /// Number of workers routed to
    #[inline]
    pub fn worker_count(&self) -> usize {
        self.inputs.len()
    }

    /// The worker index a partition maps to
    ///
    /// Stable for the lifetime of the process; the upstream consumer is
    /// responsible for partition assignment across restarts.
    #[inline]
    pub fn worker_for(&self, partition: i32) -> usize {
        let mut hasher = DefaultHasher::new();
        partition.hash(&mut hasher);
        (hasher.finish() % self.inputs.len() as u64) as usize
    }

    /// Send a Transport to its partition's worker
    ///
    /// Awaits while the destination queue is full. Fails only once the
    /// worker's input channel has closed, i.e. during teardown.
    pub async fn dispatch(&self, msg: Transport) -> Result<(), EngineError> {
        let index = self.worker_for(msg.partition);
        self.inputs[index]
            .send(msg)
            .await
            .map_err(|_| EngineError::Dispatch)
    }
}

#[cfg(test)]
#[path = "dispatch_test.rs"]
mod dispatch_test;
