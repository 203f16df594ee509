//! DustDevil Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use dustdevil_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[forwarder]\nendpoint = \"http://localhost:9100/metrics\"").unwrap();
//! ```
//!
//! # Example Minimal Config
//!
//! ```toml
//! [forwarder]
//! endpoint = "http://collector.example.com/api/metrics"
//!
//! [consumer]
//! brokers = ["localhost:9092"]
//! topics = ["metrics"]
//! ```

mod consumer;
mod error;
mod forwarder;
mod logging;
mod lookup;
mod metrics;
mod misc;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use consumer::ConsumerConfig;
pub use error::{ConfigError, Result};
pub use forwarder::{ForwarderConfig, InputFormat};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use lookup::LookupConfig;
pub use metrics::{MetricsConfig, MetricsFormat};
pub use misc::MiscConfig;

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Forwarder settings (endpoint, concurrency, retry, input format)
    pub forwarder: ForwarderConfig,

    /// Upstream message log consumer settings
    pub consumer: ConsumerConfig,

    /// Instance identity and sidecar toggles
    pub misc: MiscConfig,

    /// Metrics sidecar reporting configuration
    pub metrics: MetricsConfig,

    /// Heartbeat lookup sidecar configuration
    pub lookup: LookupConfig,

    /// Logging configuration
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or contains invalid TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// Checks for:
    /// - A usable forwarding endpoint
    /// - Positive concurrency and queue bounds
    /// - Consistent retry wait bounds
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let config = Config::from_str(
            r#"
[forwarder]
endpoint = "http://localhost:9100/metrics"
"#,
        )
        .unwrap();

        assert_eq!(config.forwarder.endpoint, "http://localhost:9100/metrics");
        assert_eq!(config.forwarder.concurrency_limit, 16);
        assert_eq!(config.forwarder.input_format, InputFormat::Batch);
        assert!(!config.misc.produce_metrics);
    }

    #[test]
    fn test_empty_config_fails_validation() {
        // No endpoint configured
        let result = Config::from_str("");
        assert!(result.is_err());
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_str(
            r#"
[forwarder]
endpoint = "http://collector:9100/api/metrics"
concurrency_limit = 4
handler_queue_length = 32
request_timeout = 2500
retry_count = 5
retry_min_wait_time = 50
retry_max_wait_time = 800
strip_string_metrics = true
input_format = "split"
forward_elastic = true
workers = 2

[consumer]
brokers = ["kafka-1:9092", "kafka-2:9092"]
group_id = "dustdevil-prod"
topics = ["metrics", "metrics-replay"]

[misc]
instance_name = "dc1"
produce_metrics = true

[metrics]
interval = "30s"
format = "json"

[lookup]
endpoint = "http://eye:9580/api/v1/lookup/heartbeat"

[log]
level = "debug"
format = "json"
path = "/var/log/dustdevil"
file = "dustdevil.log"
rotate = true
"#,
        )
        .unwrap();

        assert_eq!(config.forwarder.concurrency_limit, 4);
        assert_eq!(config.forwarder.input_format, InputFormat::Split);
        assert!(config.forwarder.forward_elastic);
        assert_eq!(config.forwarder.workers, Some(2));
        assert_eq!(config.consumer.brokers.len(), 2);
        assert_eq!(config.misc.instance_name, "dc1");
        assert!(config.misc.produce_metrics);
        assert_eq!(config.metrics.format, MetricsFormat::Json);
        assert!(config.lookup.endpoint.is_some());
        assert_eq!(config.log.level, LogLevel::Debug);
        assert!(config.log.rotate);
    }

    #[test]
    fn test_from_file_missing() {
        let result = Config::from_file("/nonexistent/dustdevil.conf");
        assert!(matches!(result, Err(ConfigError::IoError { .. })));
    }
}
