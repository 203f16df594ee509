//! MetricElastic - flat per-value documents for Elasticsearch
//!
//! Elasticsearch indexes flat documents, so a [`MetricBatch`] is exploded
//! into one document per metric value, each carrying the host id, the sample
//! time, and the typed value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::batch::MetricBatch;

/// Typed value of an Elastic document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElasticValue {
    Float(f64),
    Int(i64),
    String(String),
}

/// One flat metric document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricElastic {
    /// Originating host id
    pub host_id: i64,

    /// Sample timestamp (RFC 3339, UTC)
    pub time: DateTime<Utc>,

    /// Metric path
    pub metric: String,

    /// Subtype tag
    pub subtype: String,

    /// Value type tag: "real", "integer" or "string"
    #[serde(rename = "type")]
    pub value_type: String,

    pub value: ElasticValue,
}

impl MetricElastic {
    /// Explode a batch into flat per-value documents
    ///
    /// Document order follows the batch: per data entry, floats, then
    /// integers, then strings.
    pub fn from_batch(batch: &MetricBatch) -> Vec<MetricElastic> {
        let mut docs = Vec::with_capacity(batch.metric_count());

        for data in &batch.data {
            for m in &data.float_metrics {
                docs.push(MetricElastic {
                    host_id: batch.host_id,
                    time: data.time,
                    metric: m.metric.clone(),
                    subtype: m.subtype.clone(),
                    value_type: "real".to_string(),
                    value: ElasticValue::Float(m.value),
                });
            }
            for m in &data.int_metrics {
                docs.push(MetricElastic {
                    host_id: batch.host_id,
                    time: data.time,
                    metric: m.metric.clone(),
                    subtype: m.subtype.clone(),
                    value_type: "integer".to_string(),
                    value: ElasticValue::Int(m.value),
                });
            }
            for m in &data.string_metrics {
                docs.push(MetricElastic {
                    host_id: batch.host_id,
                    time: data.time,
                    metric: m.metric.clone(),
                    subtype: m.subtype.clone(),
                    value_type: "string".to_string(),
                    value: ElasticValue::String(m.value.clone()),
                });
            }
        }

        docs
    }
}

#[cfg(test)]
#[path = "elastic_test.rs"]
mod elastic_test;
