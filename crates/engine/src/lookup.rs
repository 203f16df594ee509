//! Heartbeat lookup sidecar client
//!
//! Relays liveness beats to the lookup sidecar. Delivery is strictly
//! best-effort: failures are logged at debug level and never affect the
//! pipeline. When no endpoint is configured, relaying is a no-op.

use std::time::Duration;

use tracing::{debug, trace};

use dustdevil_config::LookupConfig;

/// Per-beat request timeout; a stuck sidecar must not pile up relays
const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared heartbeat relay client
#[derive(Debug, Clone)]
pub struct LookupClient {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl LookupClient {
    /// Create a relay client from the lookup configuration
    pub fn new(config: &LookupConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
        }
    }

    /// Whether an endpoint is configured
    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Forward one liveness beat
    pub async fn heartbeat(&self, application: &str, worker: usize, beat: Vec<u8>) {
        let Some(endpoint) = &self.endpoint else {
            return;
        };

        let body = serde_json::json!({
            "application": application,
            "worker": worker,
            "beat": String::from_utf8_lossy(&beat),
        });

        let result = self
            .client
            .post(endpoint)
            .json(&body)
            .timeout(HEARTBEAT_TIMEOUT)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                trace!(application, worker, "heartbeat relayed");
            }
            Ok(response) => {
                debug!(
                    application,
                    worker,
                    status = response.status().as_u16(),
                    "heartbeat relay rejected"
                );
            }
            Err(e) => {
                debug!(application, worker, error = %e, "heartbeat relay failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_relay_is_noop() {
        let client = LookupClient::new(&LookupConfig::default());
        assert!(!client.is_enabled());

        // Must return immediately without touching the network
        client.heartbeat("dustdevil", 0, b"beat".to_vec()).await;
    }

    #[test]
    fn test_configured_relay_is_enabled() {
        let config = LookupConfig {
            endpoint: Some("http://localhost:9580/heartbeat".to_string()),
        };
        assert!(LookupClient::new(&config).is_enabled());
    }
}
