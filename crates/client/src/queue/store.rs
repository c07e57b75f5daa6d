//! Durable queue storage
//!
//! The queue mirrors its full record list to a durable store under one
//! fixed key after every mutation, and clears the entry once a drain
//! empties the queue. [`JsonFileStore`] is the production implementation
//! (one JSON file named after the fixed key); [`MemoryStore`] backs tests.

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::errors::QueueError;
use super::types::QueueRecord;

/// The fixed storage key the queue persists under
pub const QUEUE_STORE_KEY: &str = "offline-queue";

/// Durable mirror of the in-memory queue
#[async_trait]
pub trait QueueStore: Send + Sync + Debug {
    /// Load all persisted records, oldest first
    async fn load(&self) -> Result<Vec<QueueRecord>, QueueError>;

    /// Replace the persisted list with the given records
    async fn save(&self, records: &[QueueRecord]) -> Result<(), QueueError>;

    /// Remove the persisted entry entirely
    async fn clear(&self) -> Result<(), QueueError>;
}

/// JSON-file-backed store: `<dir>/offline-queue.json`
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store under the fixed key inside the given directory
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { path: dir.as_ref().join(format!("{QUEUE_STORE_KEY}.json")) }
    }

    /// The file the queue is mirrored to
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl QueueStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<QueueRecord>, QueueError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no persisted queue found");
                return Ok(Vec::new());
            }
            Err(err) => return Err(QueueError::storage("load", err.to_string())),
        };

        let records: Vec<QueueRecord> = serde_json::from_slice(&bytes)?;
        debug!(count = records.len(), "loaded persisted queue");
        Ok(records)
    }

    async fn save(&self, records: &[QueueRecord]) -> Result<(), QueueError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| QueueError::storage("save", err.to_string()))?;
        }
        let bytes = serde_json::to_vec_pretty(records)?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|err| QueueError::storage("save", err.to_string()))
    }

    async fn clear(&self) -> Result<(), QueueError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to clear queue store");
                Err(QueueError::storage("clear", err.to_string()))
            }
        }
    }
}

/// In-memory store for tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<QueueRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the persisted records
    pub fn records(&self) -> Vec<QueueRecord> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl QueueStore for MemoryStore {
    async fn load(&self) -> Result<Vec<QueueRecord>, QueueError> {
        Ok(self.records.lock().clone())
    }

    async fn save(&self, records: &[QueueRecord]) -> Result<(), QueueError> {
        *self.records.lock() = records.to_vec();
        Ok(())
    }

    async fn clear(&self) -> Result<(), QueueError> {
        self.records.lock().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the durable stores

    use super::*;
    use crate::queue::types::QueuedCommand;

    fn record(n: u64) -> QueueRecord {
        QueueRecord::new(QueuedCommand::insert("rows", serde_json::json!({ "n": n })))
    }

    /// Validates the JSON file store round-trips records under the fixed
    /// key and treats a missing file as an empty queue.
    #[tokio::test]
    async fn test_json_file_store_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path());

        assert!(store.load().await.expect("missing file is empty").is_empty());

        let records = vec![record(1), record(2)];
        store.save(&records).await.expect("save");
        assert!(store.path().ends_with("offline-queue.json"));

        let loaded = store.load().await.expect("load");
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, records[0].id);
        assert_eq!(loaded[1].command.payload["n"], 2);
    }

    /// Validates clear removes the entry and is idempotent.
    #[tokio::test]
    async fn test_json_file_store_clear() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path());

        store.save(&[record(1)]).await.expect("save");
        store.clear().await.expect("clear");
        store.clear().await.expect("clear twice");

        assert!(store.load().await.expect("load").is_empty());
    }

    /// Validates corrupt persisted data surfaces as a serialization error
    /// rather than a panic.
    #[tokio::test]
    async fn test_json_file_store_corrupt_data() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path());

        tokio::fs::write(store.path(), b"{ not json").await.expect("write garbage");
        let err = store.load().await.expect_err("corrupt data");
        assert!(matches!(err, QueueError::Serialization(_)));
    }

    /// Validates the memory store mirrors saves exactly.
    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();
        store.save(&[record(1)]).await.expect("save");
        assert_eq!(store.records().len(), 1);
        store.clear().await.expect("clear");
        assert!(store.load().await.expect("load").is_empty());
    }
}
