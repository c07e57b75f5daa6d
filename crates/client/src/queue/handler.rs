//! Command handlers: turning persisted data back into executable actions
//!
//! Queued commands are data; the [`HandlerRegistry`] maps a command's
//! `target` back to the code that knows how to execute it. Handlers are
//! registered at composition time (and again after a restart, before the
//! persisted queue is replayed).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::RwLock;

use holdfast_common::AppError;

use super::types::QueuedCommand;

/// Executes replayed commands for one target
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Execute the command against the backend
    ///
    /// Failures must come back classified; the queue uses the verdict to
    /// decide logging and whether the item stays queued.
    async fn execute(&self, command: &QueuedCommand) -> Result<(), AppError>;
}

/// Adapter turning an async closure into a [`CommandHandler`]
pub struct FnHandler<F>
where
    F: Fn(QueuedCommand) -> BoxFuture<'static, Result<(), AppError>> + Send + Sync,
{
    run: F,
}

impl<F> FnHandler<F>
where
    F: Fn(QueuedCommand) -> BoxFuture<'static, Result<(), AppError>> + Send + Sync,
{
    pub fn new(run: F) -> Self {
        Self { run }
    }
}

#[async_trait]
impl<F> CommandHandler for FnHandler<F>
where
    F: Fn(QueuedCommand) -> BoxFuture<'static, Result<(), AppError>> + Send + Sync,
{
    async fn execute(&self, command: &QueuedCommand) -> Result<(), AppError> {
        (self.run)(command.clone()).await
    }
}

/// Target → handler table
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn CommandHandler>>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let targets: Vec<String> = self.handlers.read().keys().cloned().collect();
        f.debug_struct("HandlerRegistry").field("targets", &targets).finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the handler for a target
    pub fn register(&self, target: impl Into<String>, handler: Arc<dyn CommandHandler>) {
        self.handlers.write().insert(target.into(), handler);
    }

    /// Resolve the handler for a command's target
    pub fn resolve(&self, target: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.read().get(target).cloned()
    }

    pub fn is_registered(&self, target: &str) -> bool {
        self.handlers.read().contains_key(target)
    }
}
