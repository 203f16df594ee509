//! Transport envelope
//!
//! The envelope the consumer wraps around every delivered message: payload
//! bytes, origin coordinates, and the commit sink used to acknowledge the
//! offset once the message has been durably forwarded. A Transport is owned
//! by the worker that received it until committed; committing consumes it,
//! so the commit sink can only ever be used once.

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::warn;

/// Offset acknowledgement sent back to the consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

/// Message envelope delivered by the consumer
#[derive(Debug)]
pub struct Transport {
    /// Origin topic
    pub topic: String,

    /// Origin partition
    pub partition: i32,

    /// Origin offset
    pub offset: i64,

    /// Originating host id, derived from the message key
    pub host_id: i64,

    /// Raw payload bytes; `None` for known-empty records
    pub value: Option<Vec<u8>>,

    /// Acknowledgement channel back to the consumer; heartbeats carry none
    pub commit_sink: Option<mpsc::Sender<Commit>>,

    /// Control-message flag: relay to the liveness sidecar, never decode
    pub heartbeat: bool,
}

impl Transport {
    /// Wrap a delivered message
    pub fn new(
        topic: impl Into<String>,
        partition: i32,
        offset: i64,
        host_id: i64,
        value: Option<Vec<u8>>,
        commit_sink: mpsc::Sender<Commit>,
    ) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            host_id,
            value,
            commit_sink: Some(commit_sink),
            heartbeat: false,
        }
    }

    /// Build a heartbeat control message
    ///
    /// The payload is the beat's creation time; it is relayed to the lookup
    /// sidecar verbatim and never committed.
    pub fn heartbeat() -> Self {
        Self {
            topic: String::new(),
            partition: 0,
            offset: 0,
            host_id: 0,
            value: Some(Utc::now().to_rfc3339().into_bytes()),
            commit_sink: None,
            heartbeat: true,
        }
    }

    /// Acknowledge this message as fully processed
    ///
    /// Consumes the envelope; a Transport is committed at most once.
    pub async fn commit(self) {
        let Some(sink) = self.commit_sink else {
            return;
        };

        let commit = Commit {
            topic: self.topic,
            partition: self.partition,
            offset: self.offset,
        };

        if sink.send(commit).await.is_err() {
            warn!("commit channel closed, offset acknowledgement dropped");
        }
    }
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod transport_test;
