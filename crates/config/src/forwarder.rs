//! Forwarder configuration
//!
//! Controls the processing engine: the POST target, the global in-flight
//! request cap, per-worker queue depth, HTTP client retry behavior, and the
//! inbound wire format.

use std::time::Duration;

use serde::Deserialize;

/// Inbound wire format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// JSON-encoded `MetricBatch` per message (default)
    #[default]
    Batch,
    /// JSON-encoded `MetricSplit` fragments, reassembled per host
    Split,
}

/// Forwarder configuration
///
/// Wait and timeout fields are plain milliseconds, matching the upstream
/// deployment configs; use the `Duration` accessors in code.
///
/// # Example
///
/// ```toml
/// [forwarder]
/// endpoint = "http://collector.example.com/api/metrics"
/// concurrency_limit = 16
/// handler_queue_length = 64
/// request_timeout = 5000
/// retry_count = 3
/// retry_min_wait_time = 100
/// retry_max_wait_time = 2000
/// strip_string_metrics = false
/// input_format = "batch"
/// forward_elastic = false
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ForwarderConfig {
    /// POST target URL
    pub endpoint: String,

    /// Global cap on simultaneous in-flight POST requests
    /// Default: 16
    pub concurrency_limit: usize,

    /// Per-worker input queue depth
    /// Default: 64
    pub handler_queue_length: usize,

    /// Per-request timeout in milliseconds
    /// Default: 5000
    pub request_timeout: u64,

    /// Additional attempts for retryable transport failures
    /// Default: 3
    pub retry_count: u32,

    /// Minimum wait between retries in milliseconds
    /// Default: 100
    pub retry_min_wait_time: u64,

    /// Maximum wait between retries in milliseconds
    /// Default: 2000
    pub retry_max_wait_time: u64,

    /// Drop string metrics before forwarding
    /// Default: false
    pub strip_string_metrics: bool,

    /// Wire format of inbound payloads (batch, split)
    /// Default: batch
    pub input_format: InputFormat,

    /// Flatten batches into Elasticsearch documents before posting
    /// Default: false
    pub forward_elastic: bool,

    /// Split-mode assembly flush cadence in milliseconds
    /// Default: 20000
    pub release_interval: u64,

    /// Number of worker tasks
    /// Default: None (auto = number of CPU cores)
    pub workers: Option<usize>,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            concurrency_limit: 16,
            handler_queue_length: 64,
            request_timeout: 5000,
            retry_count: 3,
            retry_min_wait_time: 100,
            retry_max_wait_time: 2000,
            strip_string_metrics: false,
            input_format: InputFormat::Batch,
            forward_elastic: false,
            release_interval: 20_000,
            workers: None,
        }
    }
}

impl ForwarderConfig {
    /// Get the per-request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout)
    }

    /// Get the minimum retry wait as Duration
    pub fn retry_min_wait(&self) -> Duration {
        Duration::from_millis(self.retry_min_wait_time)
    }

    /// Get the maximum retry wait as Duration
    pub fn retry_max_wait(&self) -> Duration {
        Duration::from_millis(self.retry_max_wait_time)
    }

    /// Get the split-mode release cadence as Duration
    pub fn release_interval(&self) -> Duration {
        Duration::from_millis(self.release_interval)
    }

    /// Get the effective number of workers
    ///
    /// Returns the configured value, or the CPU count if not set (auto mode).
    pub fn effective_workers(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus).max(1)
    }
}

/// Get the number of available CPUs, defaulting to 4 if detection fails
fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
