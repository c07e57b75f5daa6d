//! Guarded remote calls
//!
//! `safe_call` is the composed data path described by the layer's design:
//! each attempt runs under its own deadline, retryable failures back off
//! and retry, the raw failure is classified exactly once per attempt at
//! the boundary, and a terminal failure is reported and (unless silenced)
//! surfaced to the user before being returned.

use std::future::Future;

use tracing::debug;

use holdfast_common::{classify, with_retry_observed, with_timeout, AppError, RawFailure,
    RetryOptions};

use super::{CallOptions, SafeOps};
use crate::notify::Notifier;

/// The `{data, error}` result shape for backends that report failures as
/// payloads rather than rejections
///
/// Exactly one of `data` / `error` is populated.
#[derive(Debug, Clone)]
pub struct QueryResult<T> {
    pub data: Option<T>,
    pub error: Option<AppError>,
}

impl<T> QueryResult<T> {
    pub fn ok(data: T) -> Self {
        Self { data: Some(data), error: None }
    }

    pub fn err(error: AppError) -> Self {
        Self { data: None, error: Some(error) }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Convert back into a hard `Result`
    pub fn into_result(self) -> Result<Option<T>, AppError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.data),
        }
    }
}

impl<T> From<Result<T, AppError>> for QueryResult<T> {
    fn from(result: Result<T, AppError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(error) => Self::err(error),
        }
    }
}

async fn run_classified<T, Fut>(fut: Fut) -> Result<T, AppError>
where
    Fut: Future<Output = Result<T, RawFailure>>,
{
    fut.await.map_err(classify)
}

impl SafeOps {
    /// Execute a remote call with per-attempt timeout, retry, and the full
    /// terminal-failure policy
    ///
    /// The operation is invoked once per attempt and must describe its
    /// failures as [`RawFailure`]; classification happens here, once, at
    /// the boundary. Because each attempt runs under a detached deadline
    /// race, side-effecting operations must be idempotent.
    pub async fn safe_call<T, F, Fut>(
        &self,
        mut operation: F,
        options: &CallOptions,
    ) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RawFailure>> + Send + 'static,
        T: Send + 'static,
    {
        let deadline = options.timeout;

        let result = if options.retry {
            let retry_options =
                RetryOptions { max_retries: options.max_retries, ..RetryOptions::default() };
            let silent = options.silent;
            let max_retries = options.max_retries;
            with_retry_observed(
                || with_timeout(run_classified(operation()), deadline),
                &retry_options,
                move |attempt, error| {
                    if !silent {
                        debug!(attempt, max_retries, kind = %error.kind, "retrying guarded call");
                    }
                },
            )
            .await
        } else {
            with_timeout(run_classified(operation()), deadline).await
        };

        if let Err(error) = &result {
            self.reporter.report(error, None).await;
            if options.show_error && !options.silent {
                self.notifier.show_error(error);
            }
        }

        result
    }

    /// [`safe_call`](Self::safe_call) for side-effecting calls: retry is
    /// disabled so a non-idempotent write is never replayed blindly
    pub async fn safe_write<T, F, Fut>(
        &self,
        operation: F,
        options: &CallOptions,
    ) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RawFailure>> + Send + 'static,
        T: Send + 'static,
    {
        let options = CallOptions { retry: false, ..options.clone() };
        self.safe_call(operation, &options).await
    }

    /// [`safe_call`](Self::safe_call) absorbed into the `{data, error}`
    /// shape: the error is classified, reported, and surfaced, then handed
    /// back as a value instead of an `Err`
    pub async fn safe_query<T, F, Fut>(&self, operation: F, options: &CallOptions) -> QueryResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RawFailure>> + Send + 'static,
        T: Send + 'static,
    {
        self.safe_call(operation, options).await.into()
    }
}
