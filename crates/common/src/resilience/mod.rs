//! Resilience patterns for transient remote failures
//!
//! This module provides the two primitives every guarded remote call is
//! built from:
//!
//! - **Retry**: [`with_retry`] re-invokes a failed operation with
//!   exponential backoff, consulting the classified error's retryability
//!   verdict. Non-retryable errors propagate immediately with zero sleep.
//! - **Timeout**: [`with_timeout`] races an operation against a deadline
//!   and yields a Timeout-classified error when the deadline wins.
//!
//! [`with_retry_and_timeout`] composes both so that each attempt gets its
//! own deadline. Retries for one logical call are strictly sequential:
//! there is never more than one attempt in flight per call.

pub mod retry;
pub mod timeout;

pub use retry::{
    with_retry, with_retry_observed, InvalidRetryOptions, RetryOptions, RetryOptionsBuilder,
};
pub use timeout::{with_retry_and_timeout, with_timeout};
