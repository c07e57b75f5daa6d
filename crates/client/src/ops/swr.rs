//! Stale-while-revalidate
//!
//! A present cache value — even one close to expiry — is returned to the
//! caller immediately, and a background refresh is spawned: on success the
//! entry is overwritten exactly once and the optional `on_revalidate`
//! callback fires; on failure the error is reported and the stale value
//! simply stands, since the caller already has its result.
//!
//! Each stale read triggers at most one revalidation, but concurrent stale
//! reads are not coalesced: each may spawn its own refresh. Revalidation
//! writes are last-wins overwrites of a single entry, so the duplicates
//! cost bandwidth, not correctness.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use holdfast_common::{classify, Cache, Clock, RawFailure, SystemClock};

use super::{FallbackOptions, SafeOps};

type RevalidateHook<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Options for [`SafeOps::stale_while_revalidate`]
pub struct SwrOptions<T, C = SystemClock>
where
    T: Clone,
    C: Clock,
{
    /// The cache consulted and refreshed; clones share storage
    pub cache: Cache<T, C>,
    pub key: String,
    /// Invoked with the fresh value after a successful background refresh
    pub on_revalidate: Option<RevalidateHook<T>>,
    /// Returned when there is no cached value and the direct call fails
    pub fallback: Option<T>,
}

impl<T, C> SwrOptions<T, C>
where
    T: Clone,
    C: Clock,
{
    pub fn new(cache: Cache<T, C>, key: impl Into<String>) -> Self {
        Self { cache, key: key.into(), on_revalidate: None, fallback: None }
    }

    pub fn on_revalidate(mut self, hook: impl Fn(T) + Send + Sync + 'static) -> Self {
        self.on_revalidate = Some(Arc::new(hook));
        self
    }

    pub fn fallback(mut self, fallback: T) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

impl SafeOps {
    /// Serve cached data immediately and refresh it in the background
    ///
    /// On a cache miss this degrades to a direct, fallback-guarded call:
    /// success is cached and returned, failure is reported and the
    /// configured fallback (possibly `None`) is returned.
    pub async fn stale_while_revalidate<T, C, F, Fut>(
        &self,
        mut operation: F,
        options: SwrOptions<T, C>,
    ) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
        C: Clock + Clone,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RawFailure>> + Send + 'static,
    {
        let SwrOptions { cache, key, on_revalidate, fallback } = options;

        if let Some(stale) = cache.get(&key) {
            let refresh = operation();
            let cache = cache.clone();
            let reporter = Arc::clone(self.reporter());
            tokio::spawn(async move {
                match refresh.await {
                    Ok(fresh) => {
                        debug!(key = %key, "background revalidation succeeded");
                        cache.insert(key, fresh.clone());
                        if let Some(hook) = on_revalidate {
                            hook(fresh);
                        }
                    }
                    Err(raw) => {
                        let error = classify(raw);
                        warn!(
                            key = %key,
                            kind = %error.kind,
                            "background revalidation failed, keeping stale value"
                        );
                        reporter.report(&error, None).await;
                    }
                }
            });
            return Some(stale);
        }

        match operation().await {
            Ok(value) => {
                cache.insert(key, value.clone());
                Some(value)
            }
            // The fallback is a stand-in, never cached.
            Err(raw) => {
                self.absorb(
                    classify(raw),
                    FallbackOptions { fallback, ..FallbackOptions::default() },
                )
                .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the SWR read path
    //!
    //! The background refresh is awaited through `yield`/sleep points; the
    //! crate integration tests cover SWR against the full service stack.

    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::notify::{MemoryNotifier, Notifier};
    use crate::report::{ErrorReporter, MemorySink, ReportSink};

    fn ops_with_sink() -> (SafeOps, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let reporter = Arc::new(ErrorReporter::new(Arc::clone(&sink) as Arc<dyn ReportSink>));
        let notifier = Arc::new(MemoryNotifier::new());
        (SafeOps::new(reporter, notifier as Arc<dyn Notifier>), sink)
    }

    async fn settle() {
        // Let spawned revalidation tasks run.
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    /// Validates a present entry is returned immediately and refreshed in
    /// the background exactly once.
    #[tokio::test]
    async fn test_stale_served_then_refreshed() {
        let (ops, _sink) = ops_with_sink();
        let cache: Cache<u32> = Cache::new(Duration::from_secs(60));
        cache.insert("n", 1);

        let refreshed = Arc::new(AtomicU32::new(0));
        let refreshed_clone = Arc::clone(&refreshed);

        let out = ops
            .stale_while_revalidate(
                || async { Ok::<_, RawFailure>(2) },
                SwrOptions::new(cache.clone(), "n").on_revalidate(move |fresh| {
                    assert_eq!(fresh, 2);
                    refreshed_clone.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .await;

        assert_eq!(out, Some(1), "stale value served immediately");

        settle().await;
        assert_eq!(cache.get("n"), Some(2), "cache overwritten by the refresh");
        assert_eq!(refreshed.load(Ordering::SeqCst), 1, "hook fired exactly once");
    }

    /// Validates a miss falls through to a direct call that populates the
    /// cache.
    #[tokio::test]
    async fn test_miss_populates() {
        let (ops, _sink) = ops_with_sink();
        let cache: Cache<u32> = Cache::new(Duration::from_secs(60));

        let out = ops
            .stale_while_revalidate(
                || async { Ok::<_, RawFailure>(10) },
                SwrOptions::new(cache.clone(), "n"),
            )
            .await;

        assert_eq!(out, Some(10));
        assert_eq!(cache.get("n"), Some(10));
    }

    /// Validates a failed refresh keeps the stale value, reports the
    /// error, and surfaces nothing to the caller.
    #[tokio::test]
    async fn test_failed_refresh_keeps_stale() {
        let (ops, sink) = ops_with_sink();
        let cache: Cache<u32> = Cache::new(Duration::from_secs(60));
        cache.insert("n", 1);

        let out = ops
            .stale_while_revalidate(
                || async { Err::<u32, _>(RawFailure::status(503, "unavailable")) },
                SwrOptions::new(cache.clone(), "n"),
            )
            .await;

        assert_eq!(out, Some(1));
        settle().await;
        assert_eq!(cache.get("n"), Some(1), "stale value still served");

        ops.reporter().flush().await;
        assert_eq!(sink.reports().len(), 1, "refresh failure was reported");
    }

    /// Validates a miss with a failing operation degrades to the fallback
    /// and caches nothing.
    #[tokio::test]
    async fn test_miss_failure_uses_fallback() {
        let (ops, _sink) = ops_with_sink();
        let cache: Cache<u32> = Cache::new(Duration::from_secs(60));

        let out = ops
            .stale_while_revalidate(
                || async { Err::<u32, _>(RawFailure::transport("down")) },
                SwrOptions::new(cache.clone(), "n").fallback(0),
            )
            .await;

        assert_eq!(out, Some(0));
        assert_eq!(cache.get("n"), None);
    }
}
