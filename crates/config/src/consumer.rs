//! Upstream consumer configuration
//!
//! Settings handed to the external message-log consumer. The engine itself
//! never opens a broker connection; the binary wires these into its consumer
//! adapter.

use std::time::Duration;

use serde::Deserialize;

/// Consumer configuration
///
/// # Example
///
/// ```toml
/// [consumer]
/// brokers = ["kafka-1:9092", "kafka-2:9092"]
/// group_id = "dustdevil"
/// topics = ["metrics"]
/// session_timeout = 30000
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    /// Broker bootstrap addresses
    pub brokers: Vec<String>,

    /// Consumer group id
    /// Default: "dustdevil"
    pub group_id: String,

    /// Topics to subscribe to
    pub topics: Vec<String>,

    /// Group session timeout in milliseconds
    /// Default: 30000
    pub session_timeout: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            brokers: vec!["localhost:9092".to_string()],
            group_id: "dustdevil".to_string(),
            topics: vec!["metrics".to_string()],
            session_timeout: 30_000,
        }
    }
}

impl ConsumerConfig {
    /// Get the session timeout as Duration
    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout)
    }
}
