//! Bounded-concurrency FIFO admission for requests
//!
//! Serializes bursts of operations: at most `concurrent` run at a time
//! (default 1), admitted in submission order. Used to keep rapid-fire
//! writes from racing each other against the backend.

use std::sync::Arc;

use tokio::sync::Semaphore;

/// FIFO executor admitting a bounded number of operations at a time
#[derive(Debug, Clone)]
pub struct RequestQueue {
    permits: Arc<Semaphore>,
    concurrent: usize,
}

impl RequestQueue {
    /// Create a queue admitting `concurrent` operations at a time (minimum
    /// 1)
    pub fn new(concurrent: usize) -> Self {
        let concurrent = concurrent.max(1);
        Self { permits: Arc::new(Semaphore::new(concurrent)), concurrent }
    }

    /// Run an operation once a slot frees up; waiters are admitted in
    /// submission order
    pub async fn run<T>(&self, operation: impl std::future::Future<Output = T>) -> T {
        // The semaphore is never closed, so acquisition only fails if it
        // were; run unguarded in that impossible case rather than panic.
        match self.permits.acquire().await {
            Ok(_permit) => operation.await,
            Err(_) => operation.await,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrent
    }

    /// Slots currently free
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new(1)
    }
}
