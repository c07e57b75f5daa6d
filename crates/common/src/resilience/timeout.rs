//! Deadline racing for in-flight operations
//!
//! [`with_timeout`] races an operation against a timer. If the timer fires
//! first, the caller gets a Timeout-classified [`AppError`] and proceeds as
//! if the operation had failed — but the underlying operation is **not**
//! forcibly cancelled: it is detached and may still complete later, with
//! its result discarded. Operations with side effects must therefore be
//! idempotent (or cooperatively cancellable on their own) before being
//! guarded this way; a "timed-out" write may still land.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::AppError;
use crate::resilience::retry::{with_retry, RetryOptions};

/// Race an operation against a deadline
///
/// The operation is spawned onto the runtime so that losing the race
/// abandons it without cancelling it; its eventual completion (if any) is
/// discarded and must not assume exclusivity over caller-visible state.
/// The timer is dropped on whichever path resolves first.
pub async fn with_timeout<T, F>(operation: F, deadline: Duration) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>> + Send + 'static,
    T: Send + 'static,
{
    let mut in_flight = tokio::spawn(operation);

    tokio::select! {
        joined = &mut in_flight => match joined {
            Ok(result) => result,
            Err(join_error) => {
                Err(AppError::unknown(format!("guarded operation task failed: {join_error}")))
            }
        },
        _ = tokio::time::sleep(deadline) => {
            warn!(
                deadline_ms = deadline.as_millis() as u64,
                "operation exceeded its deadline; any eventual result will be discarded"
            );
            Err(AppError::timeout(deadline))
        }
    }
}

/// Retry an operation, giving each attempt its own deadline
///
/// Composition of [`with_retry`] over [`with_timeout`]: a timed-out attempt
/// produces a retryable Timeout error and participates in backoff like any
/// other transient failure.
pub async fn with_retry_and_timeout<T, F, Fut>(
    mut operation: F,
    deadline: Duration,
    options: &RetryOptions,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>> + Send + 'static,
    T: Send + 'static,
{
    with_retry(|| with_timeout(operation(), deadline), options).await
}
