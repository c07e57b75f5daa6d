//! Durable offline queue with ordered replay
//!
//! Side-effecting commands attempted while disconnected are recorded here
//! and replayed strictly in enqueue order once connectivity returns. Queued
//! commands are serializable data (`kind` / `target` / `payload`), not
//! closures: they are mirrored to a durable JSON store under one fixed key
//! and resolved back to executable operations through a registered
//! [`CommandHandler`] at replay time, so a queue survives a process
//! restart.

mod core;
mod errors;
mod handler;
mod store;
mod types;

pub use core::{DrainOutcome, OfflineQueue, QueueConfig};
pub use errors::QueueError;
pub use handler::{CommandHandler, FnHandler, HandlerRegistry};
pub use store::{JsonFileStore, MemoryStore, QueueStore, QUEUE_STORE_KEY};
pub use types::{CommandKind, QueueRecord, QueuedCommand};
