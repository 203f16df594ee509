//! Delay tracker
//!
//! A wait-group over detached tasks. Commits, heartbeat relays, and other
//! fire-and-forget work are launched through a tracker so shutdown can still
//! join them: `close()` then `wait()` resolves once every tracked task has
//! finished.

use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

/// Wait-group for detached background tasks
#[derive(Debug, Clone, Default)]
pub struct DelayTracker {
    tracker: TaskTracker,
}

impl DelayTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self {
            tracker: TaskTracker::new(),
        }
    }

    /// Launch a detached task under this tracker
    pub fn spawn<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: std::future::Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tracker.spawn(task)
    }

    /// Stop accepting membership; `wait()` resolves once empty
    pub fn close(&self) {
        self.tracker.close();
    }

    /// Block until the tracker is closed and every task has finished
    pub async fn wait(&self) {
        self.tracker.wait().await;
    }

    /// Number of tasks currently tracked
    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    /// Whether no tasks are currently tracked
    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }
}

#[cfg(test)]
#[path = "delay_test.rs"]
mod delay_test;
