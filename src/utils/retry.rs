//! Retry utilities with exponential backoff for resilient API calls.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::sources::SourceError;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for a single delay
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// A configuration that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set the maximum number of attempts (at least one)
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the delay before the first retry
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Delay to wait after the given (1-based) failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }
}

/// Transient errors that should trigger a retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientError {
    /// Network connectivity issues or timeouts
    Network,
    /// Too many requests (429)
    RateLimit,
    /// Server error (5xx)
    ServerError,
}

impl TransientError {
    /// Classify a SourceError; `None` means the error is permanent
    pub fn from_source_error(err: &SourceError) -> Option<Self> {
        match err {
            SourceError::Network(_) => Some(TransientError::Network),
            SourceError::RateLimit => Some(TransientError::RateLimit),
            SourceError::Server(_) => Some(TransientError::ServerError),
            _ => None,
        }
    }
}

/// Run `operation` until it succeeds, fails permanently, or runs out of attempts.
pub async fn with_retry<T, F, Fut>(config: RetryConfig, mut operation: F) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                let transient = TransientError::from_source_error(&error);
                if transient.is_none() || attempt >= config.max_attempts {
                    return Err(error);
                }

                let delay = config.delay_for(attempt);
                tracing::debug!(
                    "Transient {:?} failure on attempt {}/{}; retrying in {:?}: {}",
                    transient,
                    attempt,
                    config.max_attempts,
                    delay,
                    error
                );
                sleep(delay).await;
            }
        }
    }
}
