//! MetricSplit - the single-fragment wire form
//!
//! One fragment carries one metric value for one host and timestamp. The
//! assembly buffer folds fragments back into per-host [`MetricBatch`]es.
//!
//! [`MetricBatch`]: crate::MetricBatch

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Value type tag of a split fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitType {
    /// Float value, carried in `val.flp`
    Real,
    /// Integer value, carried in `val.int`
    Integer,
    /// Integer value, carried in `val.int`
    Long,
    /// String value, carried in `val.str`
    String,
}

/// One metric value fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSplit {
    /// Originating host id
    #[serde(default)]
    pub host_id: i64,

    /// Sample timestamp (RFC 3339, UTC)
    pub ts: DateTime<Utc>,

    /// Metric path
    pub path: String,

    /// Value type tag
    #[serde(rename = "type")]
    pub split_type: SplitType,

    /// Subtype tags; an empty list counts as one empty tag
    #[serde(default)]
    pub tags: Vec<String>,

    /// Value container; only the member named by `type` is meaningful
    #[serde(default)]
    pub val: SplitValue,
}

/// Value container of a split fragment
///
/// Absent members decode to their zero value, mirroring the producer side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitValue {
    /// Float member
    #[serde(default)]
    pub flp: f64,

    /// Integer member
    #[serde(default)]
    pub int: i64,

    /// String member
    #[serde(default)]
    pub str: String,
}

#[cfg(test)]
#[path = "split_test.rs"]
mod split_test;
