//! Per-call configuration for guarded calls

use std::time::Duration;

/// Default per-attempt deadline for guarded calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Recognized options for a guarded call
///
/// Defaults: `retry = true`, `max_retries = 3`, `timeout = 10 s`,
/// `show_error = true`, `silent = false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOptions {
    /// Retry retryable failures with exponential backoff
    pub retry: bool,
    /// Retry budget after the initial attempt
    pub max_retries: u32,
    /// Per-attempt deadline
    pub timeout: Duration,
    /// Surface terminal failures as a user-facing toast
    pub show_error: bool,
    /// Suppress per-retry logging and the toast
    pub silent: bool,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            retry: true,
            max_retries: 3,
            timeout: DEFAULT_TIMEOUT,
            show_error: true,
            silent: false,
        }
    }
}

impl CallOptions {
    pub fn no_retry(mut self) -> Self {
        self.retry = false;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn no_toast(mut self) -> Self {
        self.show_error = false;
        self
    }

    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Validates the documented defaults.
    #[test]
    fn test_defaults() {
        let options = CallOptions::default();
        assert!(options.retry);
        assert_eq!(options.max_retries, 3);
        assert_eq!(options.timeout, Duration::from_millis(10_000));
        assert!(options.show_error);
        assert!(!options.silent);
    }

    #[test]
    fn test_builders() {
        let options = CallOptions::default()
            .no_retry()
            .timeout(Duration::from_secs(2))
            .no_toast()
            .silent();
        assert!(!options.retry);
        assert_eq!(options.timeout, Duration::from_secs(2));
        assert!(!options.show_error);
        assert!(options.silent);
    }
}
