//! Integration tests for classification driving the retry/timeout stack
//!
//! These exercise the full path a guarded remote call takes: a raw failure
//! is classified once at the boundary, and the resulting verdict steers the
//! retry engine and the per-attempt deadline.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use holdfast_common::{
    classify, with_retry, with_retry_and_timeout, ErrorKind, RawFailure, RetryOptions,
};

fn quick_retry() -> RetryOptions {
    RetryOptions::builder()
        .max_retries(3)
        .initial_delay(Duration::from_millis(1))
        .build()
        .expect("valid options")
}

/// A flaky backend that produces `failures` raw failures before answering.
fn flaky(
    failures: u32,
    calls: Arc<AtomicU32>,
) -> impl FnMut() -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<u32, holdfast_common::AppError>> + Send>>
{
    move || {
        let calls = Arc::clone(&calls);
        Box::pin(async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < failures {
                Err(classify(RawFailure::status(503, "service unavailable")))
            } else {
                Ok(n)
            }
        })
    }
}

/// A 5xx-classified failure is retryable, so the engine keeps attempting
/// until the backend recovers.
#[tokio::test]
async fn server_errors_are_retried_until_recovery() {
    let calls = Arc::new(AtomicU32::new(0));
    let result = with_retry(flaky(2, Arc::clone(&calls)), &quick_retry()).await;

    assert_eq!(result.expect("third attempt succeeds"), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

/// A validation-classified failure stops the engine on the first attempt,
/// no matter how generous the retry budget is.
#[tokio::test]
async fn validation_errors_are_never_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_clone = Arc::clone(&calls);

    let result: Result<(), _> = with_retry(
        || {
            let calls = Arc::clone(&calls_clone);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(classify(RawFailure::backend("23505", "duplicate key value")))
            }
        },
        &quick_retry(),
    )
    .await;

    let err = result.expect_err("duplicate key is terminal");
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// An auth failure surfaced mid-retry interrupts the sequence immediately:
/// the session is gone and more attempts cannot help.
#[tokio::test]
async fn auth_failure_interrupts_retry_sequence() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_clone = Arc::clone(&calls);

    let result: Result<(), _> = with_retry(
        || {
            let calls = Arc::clone(&calls_clone);
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err(classify(RawFailure::transport("connection reset")))
                } else {
                    Err(classify(RawFailure::backend("PGRST301", "JWT expired")))
                }
            }
        },
        &quick_retry(),
    )
    .await;

    let err = result.expect_err("auth failure is terminal");
    assert_eq!(err.kind, ErrorKind::Auth);
    assert_eq!(calls.load(Ordering::SeqCst), 2, "one transient retry, then stop");
}

/// The deadline race resolves with a Timeout-classified error regardless of
/// the guarded operation's eventual outcome, and that error is retryable.
#[tokio::test]
async fn timeout_is_classified_and_retryable() {
    let result: Result<(), _> = holdfast_common::with_timeout(
        async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        },
        Duration::from_millis(10),
    )
    .await;

    let err = result.expect_err("deadline wins");
    assert_eq!(err.kind, ErrorKind::Timeout);
    assert!(err.retryable);
}

/// Per-attempt deadlines compose with retry: an operation that stops
/// stalling after its first attempt completes within the budget.
#[tokio::test]
async fn stalled_first_attempt_recovers_under_deadline() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_clone = Arc::clone(&calls);

    let result = with_retry_and_timeout(
        move || {
            let calls = Arc::clone(&calls_clone);
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                }
                Ok::<_, holdfast_common::AppError>("answer")
            }
        },
        Duration::from_millis(20),
        &quick_retry(),
    )
    .await;

    assert_eq!(result.expect("second attempt is fast"), "answer");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

/// The retryability verdict is fixed at classification time: transporting
/// the same error through the retry engine does not mutate it.
#[tokio::test]
async fn classification_verdict_is_immutable_through_retry() {
    let original = classify(RawFailure::status(503, "unavailable"));
    let original_retryable = original.retryable;
    let original_code = original.code.clone();

    let result: Result<(), _> = with_retry(
        || {
            let err = original.clone();
            async move { Err(err) }
        },
        &quick_retry(),
    )
    .await;

    let err = result.expect_err("always fails");
    assert_eq!(err.retryable, original_retryable);
    assert_eq!(err.code, original_code);
}
