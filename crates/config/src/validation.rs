//! Configuration validation
//!
//! Validates config consistency:
//! - A usable forwarding endpoint is configured
//! - Concurrency and queue bounds are positive
//! - Retry wait bounds are ordered
//! - Consumer identifiers are non-empty

use crate::error::{ConfigError, Result};
use crate::Config;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_forwarder(config)?;
    validate_consumer(config)?;
    Ok(())
}

/// Validate the forwarder section
fn validate_forwarder(config: &Config) -> Result<()> {
    let fwd = &config.forwarder;

    if fwd.endpoint.is_empty() {
        return Err(ConfigError::missing_field("forwarder", "endpoint"));
    }

    if !fwd.endpoint.starts_with("http://") && !fwd.endpoint.starts_with("https://") {
        return Err(ConfigError::invalid_value(
            "forwarder",
            "endpoint",
            "must be an http(s) URL",
        ));
    }

    if fwd.concurrency_limit == 0 {
        return Err(ConfigError::invalid_value(
            "forwarder",
            "concurrency_limit",
            "must be >= 1",
        ));
    }

    if fwd.handler_queue_length == 0 {
        return Err(ConfigError::invalid_value(
            "forwarder",
            "handler_queue_length",
            "must be >= 1",
        ));
    }

    if fwd.retry_min_wait_time > fwd.retry_max_wait_time {
        return Err(ConfigError::invalid_value(
            "forwarder",
            "retry_min_wait_time",
            "must not exceed retry_max_wait_time",
        ));
    }

    if fwd.release_interval == 0 {
        return Err(ConfigError::invalid_value(
            "forwarder",
            "release_interval",
            "must be >= 1",
        ));
    }

    Ok(())
}

/// Validate the consumer section
fn validate_consumer(config: &Config) -> Result<()> {
    let consumer = &config.consumer;

    if consumer.brokers.is_empty() {
        return Err(ConfigError::missing_field("consumer", "brokers"));
    }

    if consumer.topics.is_empty() {
        return Err(ConfigError::missing_field("consumer", "topics"));
    }

    if consumer.group_id.is_empty() {
        return Err(ConfigError::missing_field("consumer", "group_id"));
    }

    Ok(())
}
