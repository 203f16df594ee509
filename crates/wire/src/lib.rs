//! DustDevil wire formats
//!
//! The JSON shapes that flow through the forwarding pipeline:
//!
//! - [`MetricBatch`] - a host-scoped bundle of [`MetricData`] entries, one
//!   per timestamp; the inbound format in batch mode and the outbound format
//!   in generic mode.
//! - [`MetricSplit`] - a single-fragment wire form carrying one metric
//!   value; fragments reassemble into a `MetricBatch` per host.
//! - [`MetricElastic`] - a flat per-value document derived from a
//!   `MetricBatch`, suitable for indexing as an Elasticsearch record.
//!
//! Field names and layouts are fixed by the deployed producers and
//! consumers; empty metric slices always serialize as `[]` so that a decoded
//! and re-encoded batch is byte-stable.

mod batch;
mod elastic;
mod split;

pub use batch::{FloatMetric, IntMetric, MetricBatch, MetricData, StringMetric};
pub use elastic::{ElasticValue, MetricElastic};
pub use split::{MetricSplit, SplitType, SplitValue};
