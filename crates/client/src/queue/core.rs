//! The offline queue itself
//!
//! Item lifecycle: `Pending -> Executing -> {Done | Pending}`. Items are
//! removed only after successful execution; a failed item stays queued in
//! its original position and is retried on the next full drain pass.
//!
//! Draining is strictly FIFO (insertion order), one item at a time by
//! default, so replayed writes reach the backend in the order the user
//! performed them. If connectivity drops mid-drain, draining stops
//! immediately and everything still queued (including the item that just
//! failed) waits for the next online transition.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use holdfast_common::AppError;

use super::errors::QueueError;
use super::handler::{CommandHandler, HandlerRegistry};
use super::store::QueueStore;
use super::types::{QueueRecord, QueuedCommand};
use crate::connectivity::ConnectivityMonitor;
use crate::notify::Notifier;
use crate::report::ErrorReporter;

/// Queue tuning knobs
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Items replayed concurrently during a drain; 1 preserves the causal
    /// order of writes against the backend
    pub concurrency: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

/// Summary of one drain pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainOutcome {
    /// Executions attempted during this pass
    pub attempted: usize,
    /// Items executed and removed
    pub succeeded: usize,
    /// Items that failed and stayed queued
    pub failed: usize,
    /// True when the pass stopped early because connectivity dropped
    pub stopped_offline: bool,
}

enum ItemOutcome {
    Done,
    Failed,
    Disconnected,
}

/// Durable FIFO queue of deferred side-effecting commands
pub struct OfflineQueue {
    items: parking_lot::Mutex<Vec<QueueRecord>>,
    store: Arc<dyn QueueStore>,
    handlers: HandlerRegistry,
    monitor: ConnectivityMonitor,
    reporter: Option<Arc<ErrorReporter>>,
    notifier: Option<Arc<dyn Notifier>>,
    config: QueueConfig,
    /// One drain pass at a time; later triggers wait for the current pass
    drain_guard: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for OfflineQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineQueue")
            .field("len", &self.len())
            .field("config", &self.config)
            .finish()
    }
}

impl OfflineQueue {
    /// Create a queue over the given durable store and monitor
    ///
    /// The monitor must already exist: the queue consults it mid-drain to
    /// detect a dropped connection.
    pub fn new(store: Arc<dyn QueueStore>, monitor: ConnectivityMonitor) -> Self {
        Self {
            items: parking_lot::Mutex::new(Vec::new()),
            store,
            handlers: HandlerRegistry::new(),
            monitor,
            reporter: None,
            notifier: None,
            config: QueueConfig::default(),
            drain_guard: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    /// Register the handler executing replayed commands for a target
    pub fn register_handler(&self, target: impl Into<String>, handler: Arc<dyn CommandHandler>) {
        self.handlers.register(target, handler);
    }

    /// Load persisted records from the durable store into memory
    ///
    /// Called once at startup, after handlers are registered. Persisted
    /// records are older than anything enqueued this session, so they
    /// replay first.
    pub async fn restore(&self) -> Result<usize, QueueError> {
        let persisted = self.store.load().await?;
        let count = persisted.len();
        if count > 0 {
            info!(count, "restored persisted offline queue");
            let mut items = self.items.lock();
            let mut merged = persisted;
            merged.extend(items.drain(..));
            *items = merged;
        }
        Ok(count)
    }

    /// Append a deferred command and mirror the queue to the durable store
    pub async fn enqueue(&self, command: QueuedCommand) -> Uuid {
        let record = QueueRecord::new(command);
        let id = record.id;
        debug!(id = %id, target = %record.command.target, "queueing deferred command");

        let snapshot = {
            let mut items = self.items.lock();
            items.push(record);
            items.clone()
        };
        self.persist(&snapshot).await;

        if let Some(notifier) = &self.notifier {
            notifier.show_info("Action queued; it will run when the connection returns.");
        }
        id
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids currently queued, in replay order
    pub fn pending_ids(&self) -> Vec<Uuid> {
        self.items.lock().iter().map(|record| record.id).collect()
    }

    /// Replay queued items in FIFO order
    ///
    /// Triggered on every offline→online transition; safe to call at any
    /// time. Concurrent calls serialize behind the current pass.
    #[instrument(skip(self), fields(queued = self.len()))]
    pub async fn drain(&self) -> DrainOutcome {
        let _pass = self.drain_guard.lock().await;

        let ids = self.pending_ids();
        if ids.is_empty() {
            return DrainOutcome::default();
        }

        info!(count = ids.len(), "draining offline queue");
        if let Some(notifier) = &self.notifier {
            notifier.show_info(&format!("Replaying {} pending action(s)…", ids.len()));
        }

        let mut outcome = DrainOutcome::default();

        'pass: for chunk in ids.chunks(self.config.concurrency.max(1)) {
            let results = join_all(chunk.iter().map(|id| self.execute_one(*id))).await;

            for result in results {
                match result {
                    None => {}
                    Some(ItemOutcome::Done) => {
                        outcome.attempted += 1;
                        outcome.succeeded += 1;
                    }
                    Some(ItemOutcome::Failed) => {
                        outcome.attempted += 1;
                        outcome.failed += 1;
                    }
                    Some(ItemOutcome::Disconnected) => {
                        outcome.attempted += 1;
                        outcome.failed += 1;
                        outcome.stopped_offline = true;
                    }
                }
            }

            if outcome.stopped_offline {
                warn!(remaining = self.len(), "connection dropped mid-drain, stopping");
                if let Some(notifier) = &self.notifier {
                    notifier.show_warning("Connection lost. Remaining actions are still queued.");
                }
                break 'pass;
            }
        }

        if !outcome.stopped_offline && self.is_empty() {
            info!(replayed = outcome.succeeded, "offline queue fully drained");
            if let Some(notifier) = &self.notifier {
                notifier.show_success("All pending actions have been synchronized.");
            }
            if let Err(err) = self.store.clear().await {
                warn!(error = %err, "failed to clear drained queue store");
            }
        }

        outcome
    }

    /// Execute a command immediately, without queueing it
    ///
    /// Used by the composition layer for the online path of
    /// execute-or-queue submission.
    pub async fn execute_now(&self, command: &QueuedCommand) -> Result<(), AppError> {
        match self.handlers.resolve(&command.target) {
            Some(handler) => handler.execute(command).await,
            None => {
                let missing = QueueError::HandlerMissing(command.target.clone());
                Err(AppError::unknown(missing.to_string()))
            }
        }
    }

    /// Execute a single queued item; `None` when the item vanished before
    /// this pass reached it
    async fn execute_one(&self, id: Uuid) -> Option<ItemOutcome> {
        let record = {
            let items = self.items.lock();
            items.iter().find(|record| record.id == id).cloned()?
        };

        let result = match self.handlers.resolve(&record.command.target) {
            Some(handler) => handler.execute(&record.command).await,
            None => {
                // The item stays queued; the handler may be registered
                // before the next drain (e.g. after a restart).
                let missing = QueueError::HandlerMissing(record.command.target.clone());
                Err(AppError::unknown(missing.to_string()))
            }
        };

        match result {
            Ok(()) => {
                let snapshot = {
                    let mut items = self.items.lock();
                    items.retain(|item| item.id != id);
                    items.clone()
                };
                debug!(id = %id, "queued action replayed");
                self.persist(&snapshot).await;
                Some(ItemOutcome::Done)
            }
            Err(error) => {
                warn!(id = %id, target = %record.command.target, error = %error,
                    "queued action failed during drain");
                if let Some(reporter) = &self.reporter {
                    reporter
                        .report(
                            &error,
                            Some(serde_json::json!({
                                "queue_item": record.id,
                                "target": record.command.target,
                            })),
                        )
                        .await;
                }

                if !self.monitor.status() {
                    Some(ItemOutcome::Disconnected)
                } else {
                    Some(ItemOutcome::Failed)
                }
            }
        }
    }

    async fn persist(&self, snapshot: &[QueueRecord]) {
        if let Err(err) = self.store.save(snapshot).await {
            warn!(error = %err, "failed to mirror offline queue to durable store");
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for drain mechanics
    //!
    //! Full offline→online scenarios live in the crate integration tests;
    //! these pin the per-item bookkeeping.

    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::queue::handler::FnHandler;
    use crate::queue::store::MemoryStore;

    fn queue_with(monitor: ConnectivityMonitor) -> (Arc<OfflineQueue>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let queue =
            Arc::new(OfflineQueue::new(Arc::clone(&store) as Arc<dyn QueueStore>, monitor));
        (queue, store)
    }

    fn counting_handler(hits: Arc<AtomicU32>) -> Arc<dyn CommandHandler> {
        Arc::new(FnHandler::new(move |_| {
            let hits = Arc::clone(&hits);
            Box::pin(async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        }))
    }

    /// Validates enqueue mirrors to the store and drain removes on
    /// success, clearing the store when empty.
    #[tokio::test]
    async fn test_enqueue_and_drain() {
        let (queue, store) = queue_with(ConnectivityMonitor::new());
        let hits = Arc::new(AtomicU32::new(0));
        queue.register_handler("rows", counting_handler(Arc::clone(&hits)));

        queue.enqueue(QueuedCommand::insert("rows", serde_json::json!({"n": 1}))).await;
        queue.enqueue(QueuedCommand::insert("rows", serde_json::json!({"n": 2}))).await;
        assert_eq!(store.records().len(), 2);

        let outcome = queue.drain().await;
        assert_eq!(outcome.succeeded, 2);
        assert!(queue.is_empty());
        assert!(store.records().is_empty(), "store cleared after full drain");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    /// Validates a failed item stays queued in position while later items
    /// are still attempted (connection still up).
    #[tokio::test]
    async fn test_failure_keeps_item_and_continues() {
        let (queue, _store) = queue_with(ConnectivityMonitor::new());
        let hits = Arc::new(AtomicU32::new(0));
        let hits_clone = Arc::clone(&hits);

        queue.register_handler(
            "rows",
            Arc::new(FnHandler::new(move |command| {
                let hits = Arc::clone(&hits_clone);
                Box::pin(async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    if command.payload["n"] == 2 {
                        Err(AppError::api(
                            "backend rejected",
                            holdfast_common::ErrorSeverity::Medium,
                            false,
                        ))
                    } else {
                        Ok(())
                    }
                })
            })),
        );

        for n in 1..=3 {
            queue.enqueue(QueuedCommand::insert("rows", serde_json::json!({ "n": n }))).await;
        }

        let outcome = queue.drain().await;
        assert_eq!(outcome.attempted, 3, "item 3 still attempted after item 2 failed");
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(queue.len(), 1, "failed item remains queued");
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    /// Validates an unregistered target fails loudly while the item stays
    /// queued for a later pass.
    #[tokio::test]
    async fn test_missing_handler_keeps_item() {
        let (queue, _store) = queue_with(ConnectivityMonitor::new());
        queue.enqueue(QueuedCommand::custom("ghost", serde_json::json!({}))).await;

        let outcome = queue.drain().await;
        assert_eq!(outcome.failed, 1);
        assert_eq!(queue.len(), 1, "item stays queued; handler may be registered later");
    }

    /// Validates restore places persisted records ahead of fresh ones.
    #[tokio::test]
    async fn test_restore_merges_in_order() {
        let store = Arc::new(MemoryStore::new());
        let persisted = vec![
            QueueRecord::new(QueuedCommand::insert("rows", serde_json::json!({"n": 1}))),
            QueueRecord::new(QueuedCommand::insert("rows", serde_json::json!({"n": 2}))),
        ];
        store.save(&persisted).await.expect("seed store");

        let queue = OfflineQueue::new(
            Arc::clone(&store) as Arc<dyn QueueStore>,
            ConnectivityMonitor::new(),
        );
        queue.enqueue(QueuedCommand::insert("rows", serde_json::json!({"n": 3}))).await;

        let restored = queue.restore().await.expect("restore");
        assert_eq!(restored, 2);
        assert_eq!(queue.len(), 3);

        let ids = queue.pending_ids();
        assert_eq!(ids[0], persisted[0].id, "persisted records replay first");
        assert_eq!(ids[1], persisted[1].id);
    }

    /// Validates an empty drain is a no-op outcome.
    #[tokio::test]
    async fn test_empty_drain() {
        let (queue, _store) = queue_with(ConnectivityMonitor::new());
        assert_eq!(queue.drain().await, DrainOutcome::default());
    }
}
