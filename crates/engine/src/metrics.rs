//! Message-rate meters and the metrics sidecar
//!
//! The engine tracks two meters: messages read off the input channels and
//! messages successfully forwarded. Counters are atomics shared by every
//! worker; the sidecar reporter derives per-second rates from snapshot
//! deltas at each reporting interval and emits them under the instance
//! prefix (`/dustdevil` or `/dustdevil/<instance_name>`).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

use dustdevil_config::{Config, MetricsFormat};

use crate::error::EngineError;

/// Meter name for messages read off the input channels
pub const INPUT_METER: &str = "/input/messages.per.second";

/// Meter name for messages successfully forwarded
pub const OUTPUT_METER: &str = "/output/messages.per.second";

/// Shared message meters
///
/// All fields use atomics for lock-free updates from every worker.
#[derive(Debug, Default)]
pub struct ForwarderMetrics {
    input_messages: AtomicU64,
    output_messages: AtomicU64,
}

impl ForwarderMetrics {
    /// Create meters at zero
    pub const fn new() -> Self {
        Self {
            input_messages: AtomicU64::new(0),
            output_messages: AtomicU64::new(0),
        }
    }

    /// Record one inbound message
    #[inline]
    pub fn mark_input(&self) {
        self.input_messages.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one successfully forwarded message
    #[inline]
    pub fn mark_output(&self) {
        self.output_messages.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of current values
    #[inline]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            input_messages: self.input_messages.load(Ordering::Relaxed),
            output_messages: self.output_messages.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of the meters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub input_messages: u64,
    pub output_messages: u64,
}

/// Periodic metrics sidecar
///
/// Emits meter rates at the configured interval until cancelled. Runs only
/// when `misc.produce_metrics` is enabled.
pub struct MetricsReporter {
    prefix: String,
    interval: Duration,
    format: MetricsFormat,
    metrics: Arc<ForwarderMetrics>,
    errors: mpsc::Sender<EngineError>,
    previous: Option<(Instant, MetricsSnapshot)>,
}

impl MetricsReporter {
    /// Create a reporter over the shared meters
    pub fn new(
        config: &Config,
        metrics: Arc<ForwarderMetrics>,
        errors: mpsc::Sender<EngineError>,
    ) -> Self {
        Self {
            prefix: format!("/{}", config.misc.application()),
            interval: config.metrics.interval,
            format: config.metrics.format,
            metrics,
            errors,
            previous: None,
        }
    }

    /// The instance prefix the meters are reported under
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Run the reporter until cancellation
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            prefix = %self.prefix,
            interval_secs = self.interval.as_secs(),
            "metrics sidecar started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("metrics sidecar shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.report();
                }
            }
        }
    }

    /// Emit one reading
    fn report(&mut self) {
        let now = Instant::now();
        let snapshot = self.metrics.snapshot();

        let (input_rate, output_rate) = match self.previous {
            Some((at, prev)) => {
                let secs = now.duration_since(at).as_secs_f64().max(f64::EPSILON);
                (
                    snapshot.input_messages.saturating_sub(prev.input_messages) as f64 / secs,
                    snapshot.output_messages.saturating_sub(prev.output_messages) as f64 / secs,
                )
            }
            None => (0.0, 0.0),
        };

        match self.format {
            MetricsFormat::Human => {
                info!("{}{} {:.2}", self.prefix, INPUT_METER, input_rate);
                info!("{}{} {:.2}", self.prefix, OUTPUT_METER, output_rate);
            }
            MetricsFormat::Json => {
                let mut reading = serde_json::Map::new();
                reading.insert(
                    format!("{}{}", self.prefix, INPUT_METER),
                    serde_json::Value::from(input_rate),
                );
                reading.insert(
                    format!("{}{}", self.prefix, OUTPUT_METER),
                    serde_json::Value::from(output_rate),
                );
                match serde_json::to_string(&reading) {
                    Ok(line) => info!("{}", line),
                    Err(e) => {
                        let _ = self.errors.try_send(EngineError::Sidecar(e.to_string()));
                    }
                }
            }
        }

        self.previous = Some((now, snapshot));
    }
}

#[cfg(test)]
#[path = "metrics_test.rs"]
mod metrics_test;
