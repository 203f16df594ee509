//! Engine error types
//!
//! Every variant except [`EngineError::Dispatch`] is fatal to the pool: the
//! failing task reports it on the shared death channel and the supervisor
//! tears everything down with a non-zero exit.

use thiserror::Error;

use crate::http::PostError;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that terminate the worker pool
#[derive(Debug, Error)]
pub enum EngineError {
    /// Inbound payload was not valid JSON for the configured wire format
    #[error("failed to decode payload: {0}")]
    Decode(#[source] serde_json::Error),

    /// Outbound payload could not be serialized
    #[error("failed to encode payload: {0}")]
    Encode(#[source] serde_json::Error),

    /// Downstream POST failed: transport error, retry exhaustion, or a
    /// non-2xx response
    #[error(transparent)]
    Post(#[from] PostError),

    /// The upstream consumer reported a fatal condition
    #[error("consumer error: {0}")]
    Consumer(String),

    /// A release-cycle task died before reporting a result
    #[error("release cycle failed: {0}")]
    Release(String),

    /// The metrics sidecar reported a condition worth logging
    #[error("metrics sidecar error: {0}")]
    Sidecar(String),

    /// A worker input channel was closed while dispatching
    #[error("dispatch failed: worker input channel closed")]
    Dispatch,
}

impl EngineError {
    /// Create a consumer error
    pub fn consumer(message: impl Into<String>) -> Self {
        Self::Consumer(message.into())
    }
}
