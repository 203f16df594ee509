//! Instance identity settings

use serde::Deserialize;

/// Miscellaneous process-level settings
///
/// # Example
///
/// ```toml
/// [misc]
/// instance_name = "dc1"
/// produce_metrics = true
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MiscConfig {
    /// Instance identifier, suffixed onto the metric prefix and the
    /// heartbeat application name. Empty means unnamed.
    pub instance_name: String,

    /// Enable the metrics sidecar
    /// Default: false
    pub produce_metrics: bool,
}

impl MiscConfig {
    /// The application identity used for metric prefixes and heartbeats:
    /// `dustdevil` or `dustdevil/<instance_name>`.
    pub fn application(&self) -> String {
        if self.instance_name.is_empty() {
            "dustdevil".to_string()
        } else {
            format!("dustdevil/{}", self.instance_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_unnamed() {
        let config = MiscConfig::default();
        assert_eq!(config.application(), "dustdevil");
    }

    #[test]
    fn test_application_named() {
        let config: MiscConfig = toml::from_str("instance_name = \"dc1\"").unwrap();
        assert_eq!(config.application(), "dustdevil/dc1");
    }
}
