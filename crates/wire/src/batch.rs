//! MetricBatch - the host-scoped bundle format
//!
//! One batch carries every metric reading for a single host, grouped into
//! one [`MetricData`] entry per timestamp. The typed metric slices keep
//! `{metric path, subtype tag, value}` triples per value type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A host-scoped bundle of metric data entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricBatch {
    /// Originating host id
    pub host_id: i64,

    /// Wire protocol revision
    pub protocol: i32,

    /// One entry per timestamp
    #[serde(default)]
    pub data: Vec<MetricData>,
}

impl MetricBatch {
    /// Create an empty batch for a host
    pub fn new(host_id: i64, protocol: i32) -> Self {
        Self {
            host_id,
            protocol,
            data: Vec::new(),
        }
    }

    /// Remove every string metric from the batch
    ///
    /// The slices stay present and serialize as `[]`.
    pub fn strip_string_metrics(&mut self) {
        for data in &mut self.data {
            data.string_metrics = Vec::new();
        }
    }

    /// Total number of metric values across all entries
    pub fn metric_count(&self) -> usize {
        self.data
            .iter()
            .map(|d| d.float_metrics.len() + d.int_metrics.len() + d.string_metrics.len())
            .sum()
    }
}

/// All metric readings of one host at one timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricData {
    /// Sample timestamp (RFC 3339, UTC)
    pub time: DateTime<Utc>,

    #[serde(default)]
    pub float_metrics: Vec<FloatMetric>,

    #[serde(default)]
    pub int_metrics: Vec<IntMetric>,

    #[serde(default)]
    pub string_metrics: Vec<StringMetric>,
}

impl MetricData {
    /// Create an empty entry at a timestamp
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            time,
            float_metrics: Vec::new(),
            int_metrics: Vec::new(),
            string_metrics: Vec::new(),
        }
    }
}

/// A float-valued metric reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatMetric {
    /// Metric path
    pub metric: String,
    /// Subtype tag
    pub subtype: String,
    pub value: f64,
}

/// An integer-valued metric reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntMetric {
    /// Metric path
    pub metric: String,
    /// Subtype tag
    pub subtype: String,
    pub value: i64,
}

/// A string-valued metric reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringMetric {
    /// Metric path
    pub metric: String,
    /// Subtype tag
    pub subtype: String,
    pub value: String,
}

#[cfg(test)]
#[path = "batch_test.rs"]
mod batch_test;
