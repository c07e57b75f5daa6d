//! Bounded retry with exponential backoff
//!
//! The engine re-invokes an operation whose failures have already been
//! classified into [`AppError`], using the error's `retryable` verdict to
//! decide whether another attempt is worthwhile. The backoff delay starts
//! at `initial_delay` and is multiplied by `backoff_factor` after every
//! retry; the clamp to `max_delay` applies only to the actual sleep, so the
//! running product keeps growing for later comparisons.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::error::AppError;

/// Rejected retry configuration
#[derive(Debug, Error)]
#[error("invalid retry options: {message}")]
pub struct InvalidRetryOptions {
    message: String,
}

/// Configuration for retry behavior
///
/// A pure configuration value; the engine never mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOptions {
    /// Maximum number of retries after the initial attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound applied to each individual sleep
    pub max_delay: Duration,
    /// Multiplier applied to the delay after every retry
    pub backoff_factor: f64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            backoff_factor: 2.0,
        }
    }
}

impl RetryOptions {
    /// Create an options builder
    pub fn builder() -> RetryOptionsBuilder {
        RetryOptionsBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), InvalidRetryOptions> {
        if self.backoff_factor <= 1.0 {
            return Err(InvalidRetryOptions {
                message: "backoff_factor must be greater than 1".to_string(),
            });
        }
        if self.initial_delay.is_zero() {
            return Err(InvalidRetryOptions {
                message: "initial_delay must be non-zero".to_string(),
            });
        }
        if self.max_delay < self.initial_delay {
            return Err(InvalidRetryOptions {
                message: "max_delay must be at least initial_delay".to_string(),
            });
        }
        Ok(())
    }

    /// The delay slept before attempt `attempt + 1`, zero-based
    ///
    /// `delay_i = min(max_delay, initial_delay * backoff_factor^i)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let unclamped = self.initial_delay.mul_f64(self.backoff_factor.powi(attempt as i32));
        unclamped.min(self.max_delay)
    }
}

/// Builder for [`RetryOptions`] with validation on build
#[derive(Debug, Default)]
pub struct RetryOptionsBuilder {
    options: RetryOptions,
}

impl RetryOptionsBuilder {
    pub fn new() -> Self {
        Self { options: RetryOptions::default() }
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.options.max_retries = max_retries;
        self
    }

    pub fn initial_delay(mut self, initial_delay: Duration) -> Self {
        self.options.initial_delay = initial_delay;
        self
    }

    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.options.max_delay = max_delay;
        self
    }

    pub fn backoff_factor(mut self, backoff_factor: f64) -> Self {
        self.options.backoff_factor = backoff_factor;
        self
    }

    pub fn build(self) -> Result<RetryOptions, InvalidRetryOptions> {
        self.options.validate()?;
        Ok(self.options)
    }
}

/// Execute an operation with bounded retry and exponential backoff
///
/// The attempt counter starts at 0. On success the value is returned
/// immediately. On failure, if the attempt limit is reached or the error is
/// not retryable, the error propagates immediately with no further delay.
/// Otherwise the engine sleeps `min(max_delay, initial_delay *
/// backoff_factor^attempt)` and tries again. A single logical call only
/// ever has one attempt in flight.
pub async fn with_retry<T, F, Fut>(operation: F, options: &RetryOptions) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    with_retry_observed(operation, options, |_, _| {}).await
}

/// Like [`with_retry`], invoking `on_retry(attempt, &error)` before every
/// sleep
///
/// `attempt` is 1-based: the value passed is the number of the retry about
/// to be made.
#[instrument(skip_all, fields(max_retries = options.max_retries))]
pub async fn with_retry_observed<T, F, Fut, O>(
    mut operation: F,
    options: &RetryOptions,
    mut on_retry: O,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
    O: FnMut(u32, &AppError),
{
    let mut delay = options.initial_delay;
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(retries = attempt, "operation succeeded after retrying");
                }
                return Ok(value);
            }
            Err(error) => {
                if attempt == options.max_retries || !error.retryable {
                    if error.retryable {
                        warn!(
                            attempts = attempt + 1,
                            kind = %error.kind,
                            "retry attempts exhausted"
                        );
                    } else {
                        debug!(kind = %error.kind, "error is not retryable, propagating");
                    }
                    return Err(error);
                }

                on_retry(attempt + 1, &error);

                let sleep_for = delay.min(options.max_delay);
                warn!(
                    attempt = attempt + 1,
                    delay_ms = sleep_for.as_millis() as u64,
                    kind = %error.kind,
                    "operation failed, backing off before retry"
                );
                tokio::time::sleep(sleep_for).await;

                // Clamp applies to the sleep only; the running product keeps
                // growing.
                delay = delay.mul_f64(options.backoff_factor);
                attempt += 1;
            }
        }
    }
}
