//! Concurrency limiter
//!
//! A counting semaphore shared by every worker, bounding the number of
//! simultaneous in-flight POST requests across the entire process. There is
//! no timeout on acquisition; a worker may wait as long as it takes for a
//! slot to free up, bounded in practice by the request timeout of the
//! current permit holders.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Shared cap on in-flight outbound requests
#[derive(Debug, Clone)]
pub struct Limiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl Limiter {
    /// Create a limiter with the given slot count
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Acquire a request slot, waiting until one is free
    ///
    /// The slot is released when the returned permit is dropped.
    pub async fn acquire(&self) -> OwnedSemaphorePermit {
        Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            // the semaphore is never closed
            .expect("limiter semaphore closed")
    }

    /// The configured slot count
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[cfg(test)]
#[path = "limit_test.rs"]
mod limit_test;
