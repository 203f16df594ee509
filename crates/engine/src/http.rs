//! HTTP poster
//!
//! One per worker: a reqwest client configured at worker start, wrapped with
//! the retry discipline the endpoint expects. Retries cover retryable
//! transport failures only (timeouts, connection errors) with a doubling
//! backoff clamped between the configured wait bounds; application-level
//! responses are classified and surfaced, never retried here - the forwarder
//! decides they are fatal.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::debug;

use dustdevil_config::ForwarderConfig;

/// Redirect hops the client will follow before giving up
const MAX_REDIRECTS: usize = 15;

/// Errors from a POST attempt
#[derive(Debug, Error)]
pub enum PostError {
    /// Building the client or a non-retryable transport failure
    #[error("http request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered outside 2xx
    #[error("http response was: {status}")]
    Status { status: u16 },

    /// Every attempt failed with a retryable transport error
    #[error("all {attempts} attempts failed: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

/// Timeout/retry-configured JSON POST client
#[derive(Debug, Clone)]
pub struct MetricPoster {
    client: reqwest::Client,
    endpoint: String,
    request_timeout: Duration,
    retry_count: u32,
    retry_min_wait: Duration,
    retry_max_wait: Duration,
}

impl MetricPoster {
    /// Build a poster from the forwarder configuration
    pub fn new(config: &ForwarderConfig) -> Result<Self, PostError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            request_timeout: config.request_timeout(),
            retry_count: config.retry_count,
            retry_min_wait: config.retry_min_wait(),
            retry_max_wait: config.retry_max_wait(),
        })
    }

    /// The configured POST target
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Backoff before retry attempt N (doubles, clamped to the wait bounds)
    fn retry_delay(&self, attempt: u32) -> Duration {
        let base = self.retry_min_wait.as_millis() as u64;
        let scaled = base.saturating_mul(1u64 << attempt.min(16));
        Duration::from_millis(scaled)
            .clamp(self.retry_min_wait, self.retry_max_wait)
    }

    /// POST a JSON body to the endpoint
    ///
    /// The timeout is applied per request, so every retry attempt gets the
    /// full window.
    pub async fn post(&self, body: Vec<u8>) -> Result<(), PostError> {
        let mut last_error = String::new();

        for attempt in 0..=self.retry_count {
            if attempt > 0 {
                tokio::time::sleep(self.retry_delay(attempt - 1)).await;
            }

            let result = self
                .client
                .post(&self.endpoint)
                .header(CONTENT_TYPE, "application/json")
                .timeout(self.request_timeout)
                .body(body.clone())
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(());
                    }
                    // application-level failure: surface, do not retry
                    return Err(PostError::Status {
                        status: status.as_u16(),
                    });
                }
                Err(e) if is_retryable(&e) => {
                    last_error = e.to_string();
                    if attempt == self.retry_count {
                        return Err(PostError::RetriesExhausted {
                            attempts: attempt + 1,
                            last_error,
                        });
                    }
                    debug!(
                        endpoint = %self.endpoint,
                        attempt = attempt + 1,
                        max_attempts = self.retry_count + 1,
                        error = %e,
                        "post attempt failed, will retry"
                    );
                }
                Err(e) => return Err(PostError::Transport(e)),
            }
        }

        Err(PostError::RetriesExhausted {
            attempts: self.retry_count + 1,
            last_error,
        })
    }
}

/// Whether a transport failure is worth another attempt
fn is_retryable(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}

#[cfg(test)]
#[path = "http_test.rs"]
mod http_test;
