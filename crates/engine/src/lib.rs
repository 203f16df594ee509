//! DustDevil processing engine
//!
//! The middle stage of the telemetry pipeline: consume metric messages from
//! a partitioned, at-least-once message log, reshape them, POST them as JSON
//! to an HTTP collector or Elasticsearch endpoint, and acknowledge offsets
//! only after the downstream write succeeded.
//!
//! # Architecture
//!
//! - [`Pool`] supervises N forwarder workers, the metrics sidecar, and the
//!   consumer, and owns the ordered shutdown sequence.
//! - [`Dispatcher`] routes inbound [`Transport`] envelopes onto worker input
//!   queues by a partition-stable hash, so one partition is only ever
//!   handled by one worker.
//! - Each worker decodes, reshapes (and in split mode reassembles), POSTs
//!   under the shared [`Limiter`], and commits the envelope back to the
//!   consumer on success.
//! - Any fatal error lands on the shared death channel and tears the whole
//!   pool down; the upstream log redelivers whatever was not committed.
//!
//! The consumer itself is an external collaborator behind the [`Consumer`]
//! trait - the engine never opens a broker connection.

mod assembly;
mod consumer;
mod delay;
mod dispatch;
mod error;
mod forwarder;
mod http;
mod limit;
mod lookup;
mod metrics;
mod pool;
mod transport;

pub use assembly::AssemblyBuffer;
pub use consumer::Consumer;
pub use delay::DelayTracker;
pub use dispatch::Dispatcher;
pub use error::{EngineError, Result};
pub use http::{MetricPoster, PostError};
pub use limit::Limiter;
pub use lookup::LookupClient;
pub use metrics::{ForwarderMetrics, MetricsReporter, MetricsSnapshot, INPUT_METER, OUTPUT_METER};
pub use pool::Pool;
pub use transport::{Commit, Transport};
