//! Assembly buffer
//!
//! Split-mode state: per-host maps of timestamp to the `MetricData` under
//! construction, plus a parallel queue of Transports awaiting
//! acknowledgement. Owned by a single worker and serialized by that worker's
//! assembly mutex; never shared across workers.
//!
//! A host's entry lives from the first absorbed fragment until the release
//! cycle forwards its batch successfully. A failed release leaves the entry
//! intact; the fragments stay uncommitted and the upstream log redelivers
//! them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use dustdevil_wire::{FloatMetric, IntMetric, MetricBatch, MetricData, MetricSplit, SplitType, StringMetric};

use crate::transport::Transport;

/// Wire protocol revision stamped onto reassembled batches
const ASSEMBLED_PROTOCOL: i32 = 1;

/// Per-host accumulation state
#[derive(Debug, Default)]
struct HostAssembly {
    /// One entry per timestamp, under construction
    data: HashMap<DateTime<Utc>, MetricData>,

    /// Transports whose fragments contributed; committed on release
    pending: Vec<Transport>,
}

/// Per-worker fragment accumulator
#[derive(Debug, Default)]
pub struct AssemblyBuffer {
    hosts: HashMap<i64, HostAssembly>,
}

impl AssemblyBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest one fragment
    ///
    /// Host and timestamp entries are created lazily. When string metrics
    /// are being stripped and the fragment is a string, it contributes
    /// nothing and the Transport is handed back for immediate commit;
    /// otherwise the Transport joins the host's pending queue.
    pub fn absorb(
        &mut self,
        msg: Transport,
        split: &MetricSplit,
        strip_string_metrics: bool,
    ) -> Option<Transport> {
        let host = self.hosts.entry(msg.host_id).or_default();
        let data = host
            .data
            .entry(split.ts)
            .or_insert_with(|| MetricData::new(split.ts));

        if strip_string_metrics && split.split_type == SplitType::String {
            return Some(msg);
        }

        // no tags counts as a single empty tag
        let default_tag = [String::new()];
        let tags: &[String] = if split.tags.is_empty() {
            &default_tag
        } else {
            &split.tags
        };

        for tag in tags {
            match split.split_type {
                SplitType::Real => data.float_metrics.push(FloatMetric {
                    metric: split.path.clone(),
                    subtype: tag.clone(),
                    value: split.val.flp,
                }),
                SplitType::Integer | SplitType::Long => data.int_metrics.push(IntMetric {
                    metric: split.path.clone(),
                    subtype: tag.clone(),
                    value: split.val.int,
                }),
                SplitType::String => data.string_metrics.push(StringMetric {
                    metric: split.path.clone(),
                    subtype: tag.clone(),
                    value: split.val.str.clone(),
                }),
            }
        }

        host.pending.push(msg);
        None
    }

    /// Hosts currently holding accumulated state
    pub fn host_ids(&self) -> Vec<i64> {
        self.hosts.keys().copied().collect()
    }

    /// Snapshot a host's accumulated batch for forwarding
    ///
    /// Returns `None` when the host has no data entries. The host's state
    /// is untouched; call [`complete`] after a successful forward.
    ///
    /// [`complete`]: AssemblyBuffer::complete
    pub fn batch_for(&self, host_id: i64) -> Option<MetricBatch> {
        let host = self.hosts.get(&host_id)?;
        if host.data.is_empty() {
            return None;
        }

        let mut batch = MetricBatch::new(host_id, ASSEMBLED_PROTOCOL);
        batch.data = host.data.values().cloned().collect();
        // stable output order
        batch.data.sort_by_key(|d| d.time);
        Some(batch)
    }

    /// Tear down a host's entry after a successful forward
    ///
    /// Returns the pending Transports so the caller can commit them.
    pub fn complete(&mut self, host_id: i64) -> Vec<Transport> {
        self.hosts
            .remove(&host_id)
            .map(|host| host.pending)
            .unwrap_or_default()
    }

    /// Number of hosts with accumulated state
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Whether no host holds accumulated state
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Length of a host's pending commit queue
    pub fn pending_len(&self, host_id: i64) -> usize {
        self.hosts.get(&host_id).map_or(0, |h| h.pending.len())
    }
}

#[cfg(test)]
#[path = "assembly_test.rs"]
mod assembly_test;
