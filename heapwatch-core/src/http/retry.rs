use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use super::error::HttpError;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one.
    pub max_retries: usize,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay_ms: 250,
            max_delay_ms: 2000,
        }
    }
}

impl RetryConfig {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_retries: 1,
            ..Self::default()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    #[error("Giving up after {attempts} attempts: {error}")]
    ExhaustedRetries { error: HttpError, attempts: usize },
    #[error("{0}")]
    NonRetriable(HttpError),
}

impl RetryError {
    pub fn http_error(&self) -> &HttpError {
        match self {
            Self::ExhaustedRetries { error, .. } => error,
            Self::NonRetriable(error) => error,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        self.http_error().status_code()
    }

    pub fn is_auth_error(&self) -> bool {
        self.http_error().is_auth_error()
    }
}

/// Runs `f` until it succeeds, fails with a non-retriable error or the
/// configured attempts are used up. The delay doubles after every attempt.
pub async fn with_retry<F, Fut, T>(f: F, config: &RetryConfig) -> Result<T, RetryError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, HttpError>>,
{
    let max_attempts = config.max_retries.max(1);
    let mut attempt = 1;
    let mut delay = config.initial_delay_ms;

    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retriable() {
                    return Err(RetryError::NonRetriable(err));
                }

                if attempt >= max_attempts {
                    return Err(RetryError::ExhaustedRetries {
                        error: err,
                        attempts: max_attempts,
                    });
                }

                warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay,
                    error = %err,
                    "Request to management endpoint failed, retrying"
                );

                sleep(Duration::from_millis(delay)).await;

                attempt += 1;
                delay = (delay * 2).min(config.max_delay_ms);
            }
        }
    }
}
