//! Foundation primitives for the holdfast resilience layer.
//!
//! This crate carries the building blocks that the composed client services
//! in `holdfast-client` are assembled from:
//!
//! - [`error`]: the failure taxonomy ([`AppError`], [`ErrorKind`],
//!   [`ErrorSeverity`]), the [`RawFailure`] input shapes, and the
//!   [`classify`] rules that turn an arbitrary failure into a typed error
//!   with a fixed retryability verdict.
//! - [`resilience`]: bounded retry with exponential backoff and deadline
//!   racing ([`with_retry`], [`with_timeout`]).
//! - [`cache`]: a TTL-bounded key/value store with lazy eviction on read.
//! - [`time`]: the [`Clock`] abstraction with a mock implementation for
//!   deterministic tests.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod cache;
pub mod error;
pub mod resilience;
pub mod time;

// Re-export commonly used types and functions for convenience
// ------------------------
pub use cache::Cache;
pub use error::{
    classify, should_report, user_message_for, AppError, AppResult, ErrorClassification,
    ErrorKind, ErrorSeverity, RawFailure,
};
pub use resilience::{
    with_retry, with_retry_and_timeout, with_retry_observed, with_timeout, InvalidRetryOptions,
    RetryOptions, RetryOptionsBuilder,
};
pub use time::{Clock, MockClock, SystemClock};
