use std::time::Duration;
use tracing::{debug, error, warn};

use super::EmbeddingServiceError;

pub(crate) const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const EXPONENTIAL_BACKOFF_BASE: u32 = 2;

/// Retry schedule shared by the HTTP providers. Server errors and transport
/// failures are retried with exponential backoff; client errors are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRY_ATTEMPTS,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub(crate) fn run<F>(&self, endpoint: &str, mut request_fn: F) -> Result<String, EmbeddingServiceError>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        let attempts = self.attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            debug!("HTTP request attempt {}/{}", attempt, attempts);

            match request_fn() {
                Ok(response_text) => {
                    debug!("Request succeeded on attempt {}", attempt);
                    return Ok(response_text);
                }
                Err(error) => {
                    let retryable = match &error {
                        ureq::Error::StatusCode(status) => {
                            if *status >= 500 {
                                warn!(
                                    "Server error (status {}), attempt {}/{}",
                                    status, attempt, attempts
                                );
                                last_error = Some(EmbeddingServiceError::Status { status: *status });
                                true
                            } else {
                                warn!("Client error (status {}), not retrying", status);
                                return Err(EmbeddingServiceError::Status { status: *status });
                            }
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!(
                                "Transport error: {}, attempt {}/{}",
                                error, attempt, attempts
                            );
                            last_error = Some(EmbeddingServiceError::Request(error.to_string()));
                            true
                        }
                        _ => false,
                    };

                    if !retryable {
                        warn!("Non-retryable error: {}", error);
                        return Err(EmbeddingServiceError::Request(error.to_string()));
                    }

                    if attempt < attempts {
                        let delay = self.backoff * EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1);
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        error!("All retry attempts failed for request to {}", endpoint);

        Err(last_error.unwrap_or_else(|| {
            EmbeddingServiceError::Request("request failed after retries".to_string())
        }))
    }
}
