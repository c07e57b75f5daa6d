//! Graceful degradation into fallback values
//!
//! The building block used by the cache helpers and by any call site that
//! prefers a degraded-but-working result over surfacing an error: the
//! failure is classified, reported (unless told not to), handed to an
//! optional callback, and swallowed in favor of the configured fallback.

use std::future::Future;

use tracing::warn;

use holdfast_common::{classify, AppError, Cache, Clock, RawFailure};

use super::SafeOps;

type OnError = Box<dyn Fn(&AppError) + Send + Sync>;

/// Options for [`SafeOps::with_fallback`] and friends
pub struct FallbackOptions<T> {
    /// Value returned instead of the error; `None` is a legal fallback
    pub fallback: Option<T>,
    /// Invoked with the classified error before the fallback is returned
    pub on_error: Option<OnError>,
    /// Suppress the degradation log line
    pub silent: bool,
    /// Report the classified error (subject to the reporting policy)
    pub log_error: bool,
}

impl<T> Default for FallbackOptions<T> {
    fn default() -> Self {
        Self { fallback: None, on_error: None, silent: false, log_error: true }
    }
}

impl<T> std::fmt::Debug for FallbackOptions<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackOptions")
            .field("has_fallback", &self.fallback.is_some())
            .field("has_on_error", &self.on_error.is_some())
            .field("silent", &self.silent)
            .field("log_error", &self.log_error)
            .finish()
    }
}

impl<T> FallbackOptions<T> {
    pub fn with_value(fallback: T) -> Self {
        Self { fallback: Some(fallback), ..Self::default() }
    }

    pub fn on_error(mut self, on_error: impl Fn(&AppError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(on_error));
        self
    }

    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    pub fn no_log(mut self) -> Self {
        self.log_error = false;
        self
    }
}

impl SafeOps {
    pub(super) async fn absorb<T>(
        &self,
        error: AppError,
        options: FallbackOptions<T>,
    ) -> Option<T> {
        if options.log_error {
            self.reporter().report(&error, None).await;
        }
        if let Some(on_error) = &options.on_error {
            on_error(&error);
        }
        if !options.silent {
            warn!(kind = %error.kind, "operation failed, using fallback: {}", error.user_message);
        }
        options.fallback
    }

    /// Execute an operation, degrading to the configured fallback on
    /// failure instead of propagating
    pub async fn with_fallback<T, F, Fut>(
        &self,
        operation: F,
        options: FallbackOptions<T>,
    ) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RawFailure>>,
    {
        match operation().await {
            Ok(value) => Some(value),
            Err(raw) => self.absorb(classify(raw), options).await,
        }
    }

    /// Synchronous counterpart of [`with_fallback`](Self::with_fallback)
    /// for fallible non-async closures
    pub fn safe_execute<T, F>(&self, operation: F, options: FallbackOptions<T>) -> Option<T>
    where
        F: FnOnce() -> Result<T, RawFailure>,
    {
        match operation() {
            Ok(value) => Some(value),
            Err(raw) => {
                let error = classify(raw);
                if options.log_error {
                    self.reporter().report_sync(&error, None);
                }
                if let Some(on_error) = &options.on_error {
                    on_error(&error);
                }
                if !options.silent {
                    warn!(
                        kind = %error.kind,
                        "operation failed, using fallback: {}",
                        error.user_message
                    );
                }
                options.fallback
            }
        }
    }

    /// Cache-first read-through: serve the cached value when present,
    /// otherwise call, cache on success, degrade to the fallback on
    /// failure
    pub async fn with_cache<T, C, F, Fut>(
        &self,
        key: &str,
        operation: F,
        cache: &Cache<T, C>,
        options: FallbackOptions<T>,
    ) -> Option<T>
    where
        T: Clone,
        C: Clock,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RawFailure>>,
    {
        if let Some(cached) = cache.get(key) {
            return Some(cached);
        }

        match operation().await {
            Ok(value) => {
                cache.insert(key, value.clone());
                Some(value)
            }
            Err(raw) => self.absorb(classify(raw), options).await,
        }
    }
}
