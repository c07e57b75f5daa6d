//! Composed resilience services for client applications
//!
//! Where `holdfast-common` carries the primitives (taxonomy, retry,
//! timeout, cache), this crate assembles them into the stateful services an
//! interactive application actually wires up once at startup:
//!
//! - [`report`]: the batched [`ErrorReporter`] and its [`ReportSink`]s.
//! - [`notify`]: user-facing toasts with severity-derived dismissal.
//! - [`connectivity`]: the [`ConnectivityMonitor`] fanning platform
//!   online/offline transitions out to subscribers.
//! - [`queue`]: the durable [`OfflineQueue`] replaying serialized commands
//!   in order once connectivity returns.
//! - [`flags`]: the [`FeatureFlags`] registry and degradation helpers.
//! - [`ops`]: the guarded call surface ([`SafeOps`]) composing timeout,
//!   retry, classification, reporting, and notification per call.
//! - [`services`]: the [`Services`] composition root, which owns all of the
//!   above, enforces construction order (the monitor must exist before the
//!   queue subscribes to it), and tears everything down explicitly.
//!
//! All services are constructed once at startup and passed by handle; none
//! of them is ambient global state.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod connectivity;
pub mod flags;
pub mod notify;
pub mod ops;
pub mod queue;
pub mod report;
pub mod services;

// Re-export commonly used types for convenience
// ------------------------
pub use connectivity::{ConnectivityMonitor, ConnectivityState, Subscription};
pub use flags::FeatureFlags;
pub use notify::{DismissAfter, MemoryNotifier, Notifier, Toast, ToastKind, TracingNotifier};
pub use ops::{
    CallOptions, FallbackOptions, QueryResult, RequestQueue, SafeOps, SwrOptions,
};
pub use queue::{
    CommandHandler, CommandKind, DrainOutcome, FnHandler, HandlerRegistry, JsonFileStore,
    MemoryStore, OfflineQueue, QueueError, QueueRecord, QueueStore, QueuedCommand,
};
pub use report::{
    DeliveryError, ErrorReport, ErrorReporter, MemorySink, ReportSink, ReporterConfig, TracingSink,
};
pub use services::{Services, ServicesBuilder};
