//! Heartbeat lookup sidecar configuration

use serde::Deserialize;

/// Lookup sidecar configuration
///
/// When no endpoint is configured, heartbeat relaying is a no-op.
///
/// # Example
///
/// ```toml
/// [lookup]
/// endpoint = "http://eye:9580/api/v1/lookup/heartbeat"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Heartbeat POST target; absent disables relaying
    pub endpoint: Option<String>,
}
