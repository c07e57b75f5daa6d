//! Batched error reporting
//!
//! Classified errors worth persisting (per [`should_report`]) are queued in
//! memory and delivered to a [`ReportSink`] in batches: on a timer (default
//! 30 s), immediately when the bounded queue fills (default 50 entries),
//! and on explicit shutdown. A failed delivery re-queues its batch at the
//! front so reports are not silently dropped.
//!
//! The reporter is constructed once at startup; [`ErrorReporter::start`]
//! spawns the flush task and [`ErrorReporter::shutdown`] is explicit and
//! idempotent.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use holdfast_common::{should_report, AppError, ErrorKind, ErrorSeverity};

/// Delivery failure from a [`ReportSink`]
#[derive(Debug, Error)]
#[error("report delivery failed: {message}")]
pub struct DeliveryError {
    message: String,
}

impl DeliveryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// The serializable record persisted for one classified error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub timestamp: DateTime<Utc>,
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub code: Option<String>,
    pub message: String,
    /// Opaque call-site context (query name, item id, …)
    pub context: Option<serde_json::Value>,
}

impl ErrorReport {
    pub fn from_error(error: &AppError, context: Option<serde_json::Value>) -> Self {
        Self {
            timestamp: error.timestamp,
            kind: error.kind,
            severity: error.severity,
            code: error.code.clone(),
            message: error.message.clone(),
            context,
        }
    }
}

/// Destination for report batches
#[async_trait]
pub trait ReportSink: Send + Sync + Debug {
    /// Deliver one batch; an error re-queues the whole batch
    async fn deliver(&self, batch: Vec<ErrorReport>) -> Result<(), DeliveryError>;
}

/// Configuration for the batched reporter
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    /// Queue size that forces an immediate flush
    pub max_queue: usize,
    /// Interval between timed flushes
    pub flush_interval: Duration,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self { max_queue: 50, flush_interval: Duration::from_secs(30) }
    }
}

/// Batched, bounded error reporter
#[derive(Debug)]
pub struct ErrorReporter {
    queue: Arc<Mutex<Vec<ErrorReport>>>,
    sink: Arc<dyn ReportSink>,
    config: ReporterConfig,
    shutdown: AtomicBool,
    flush_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl ErrorReporter {
    /// Create a reporter with default bounds (50 entries / 30 s)
    pub fn new(sink: Arc<dyn ReportSink>) -> Self {
        Self::with_config(sink, ReporterConfig::default())
    }

    pub fn with_config(sink: Arc<dyn ReportSink>, config: ReporterConfig) -> Self {
        Self {
            queue: Arc::new(Mutex::new(Vec::new())),
            sink,
            config,
            shutdown: AtomicBool::new(false),
            flush_task: Mutex::new(None),
        }
    }

    /// Spawn the timed flush task
    ///
    /// Requires a running tokio runtime; calling it twice replaces nothing
    /// (the second call is ignored).
    pub fn start(self: &Arc<Self>) {
        let mut slot = self.flush_task.lock();
        if slot.is_some() {
            return;
        }

        let reporter = Arc::clone(self);
        let interval = self.config.flush_interval;
        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if reporter.shutdown.load(Ordering::Relaxed) {
                    break;
                }
                reporter.flush().await;
            }
        }));
    }

    /// Record a classified error, subject to the reporting policy
    ///
    /// Forces an immediate flush when the bounded queue fills.
    pub async fn report(&self, err: &AppError, context: Option<serde_json::Value>) {
        if !self.enqueue(err, context) {
            return;
        }
        if self.len() >= self.config.max_queue {
            debug!(max_queue = self.config.max_queue, "report queue full, flushing");
            self.flush().await;
        }
    }

    /// Synchronous variant of [`report`](Self::report) for non-async call
    /// sites; a saturation flush is spawned instead of awaited.
    pub fn report_sync(&self, err: &AppError, context: Option<serde_json::Value>) {
        if !self.enqueue(err, context) {
            return;
        }
        if self.len() >= self.config.max_queue {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let sink = Arc::clone(&self.sink);
                    let queue = Arc::clone(&self.queue);
                    let batch = self.take_batch();
                    handle.spawn(async move {
                        if let Some(returned) = deliver_or_log(&sink, batch).await {
                            let mut queue = queue.lock();
                            let mut restored = returned;
                            restored.extend(queue.drain(..));
                            *queue = restored;
                        }
                    });
                }
                Err(_) => {
                    warn!("report queue full with no active runtime; flush deferred");
                }
            }
        }
    }

    fn enqueue(&self, err: &AppError, context: Option<serde_json::Value>) -> bool {
        if self.shutdown.load(Ordering::Relaxed) || !should_report(err) {
            return false;
        }
        debug!(kind = %err.kind, severity = %err.severity, "error report queued");
        self.queue.lock().push(ErrorReport::from_error(err, context));
        true
    }

    fn take_batch(&self) -> Vec<ErrorReport> {
        std::mem::take(&mut *self.queue.lock())
    }

    /// Deliver everything queued; a failed delivery re-queues its batch
    pub async fn flush(&self) {
        let batch = self.take_batch();
        if batch.is_empty() {
            return;
        }
        let count = batch.len();
        if let Some(returned) = deliver_or_log(&self.sink, batch).await {
            let mut queue = self.queue.lock();
            let mut restored = returned;
            restored.extend(queue.drain(..));
            *queue = restored;
        } else {
            debug!(count, "error reports flushed");
        }
    }

    /// Number of queued, not-yet-delivered reports
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all queued reports without delivering them
    pub fn clear(&self) {
        self.queue.lock().clear();
    }

    /// Final flush and stop; explicit and idempotent
    pub async fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(task) = self.flush_task.lock().take() {
            task.abort();
        }
        self.flush().await;
    }
}

/// Deliver a batch, returning it back on failure so the caller can re-queue
async fn deliver_or_log(
    sink: &Arc<dyn ReportSink>,
    batch: Vec<ErrorReport>,
) -> Option<Vec<ErrorReport>> {
    let retained = batch.clone();
    match sink.deliver(batch).await {
        Ok(()) => None,
        Err(err) => {
            error!(error = %err, "failed to deliver error reports, re-queueing batch");
            Some(retained)
        }
    }
}

/// Production sink: structured tracing events, one per report
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

#[async_trait]
impl ReportSink for TracingSink {
    async fn deliver(&self, batch: Vec<ErrorReport>) -> Result<(), DeliveryError> {
        for report in batch {
            error!(
                kind = %report.kind,
                severity = %report.severity,
                code = report.code.as_deref().unwrap_or("-"),
                timestamp = %report.timestamp,
                "{}",
                report.message
            );
        }
        Ok(())
    }
}

/// Test sink recording delivered batches in memory
///
/// `fail_next(n)` makes the next `n` deliveries fail, for exercising the
/// re-queue path.
#[derive(Debug, Default)]
pub struct MemorySink {
    batches: Mutex<Vec<Vec<ErrorReport>>>,
    fail_remaining: Mutex<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, count: usize) {
        *self.fail_remaining.lock() = count;
    }

    /// All successfully delivered batches
    pub fn batches(&self) -> Vec<Vec<ErrorReport>> {
        self.batches.lock().clone()
    }

    /// All delivered reports, flattened
    pub fn reports(&self) -> Vec<ErrorReport> {
        self.batches.lock().iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl ReportSink for MemorySink {
    async fn deliver(&self, batch: Vec<ErrorReport>) -> Result<(), DeliveryError> {
        {
            let mut remaining = self.fail_remaining.lock();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(DeliveryError::new("simulated delivery failure"));
            }
        }
        self.batches.lock().push(batch);
        Ok(())
    }
}
