//! Queue item types
//!
//! A queued command is pure data. The original action's closure is gone by
//! replay time (and would not survive a restart anyway), so everything a
//! handler needs to re-execute the action must be in the payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What the replayed action does to its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Insert,
    Update,
    Delete,
    /// Escape hatch for actions that are not simple row mutations; the
    /// handler interprets the payload
    Custom,
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

/// A serializable deferred action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedCommand {
    pub kind: CommandKind,
    /// Handler routing key, typically the backend table or endpoint name
    pub target: String,
    pub payload: serde_json::Value,
}

impl QueuedCommand {
    pub fn new(kind: CommandKind, target: impl Into<String>, payload: serde_json::Value) -> Self {
        Self { kind, target: target.into(), payload }
    }

    pub fn insert(target: impl Into<String>, payload: serde_json::Value) -> Self {
        Self::new(CommandKind::Insert, target, payload)
    }

    pub fn update(target: impl Into<String>, payload: serde_json::Value) -> Self {
        Self::new(CommandKind::Update, target, payload)
    }

    pub fn delete(target: impl Into<String>, payload: serde_json::Value) -> Self {
        Self::new(CommandKind::Delete, target, payload)
    }

    pub fn custom(target: impl Into<String>, payload: serde_json::Value) -> Self {
        Self::new(CommandKind::Custom, target, payload)
    }
}

/// One queued item as held in memory and mirrored to the durable store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueRecord {
    pub id: Uuid,
    pub command: QueuedCommand,
    pub enqueued_at: DateTime<Utc>,
}

impl QueueRecord {
    pub fn new(command: QueuedCommand) -> Self {
        Self { id: Uuid::new_v4(), command, enqueued_at: Utc::now() }
    }
}
