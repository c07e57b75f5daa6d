//! The guarded call surface
//!
//! [`SafeOps`] is what application code actually talks to: every remote
//! call goes through one of its helpers, which compose the primitives from
//! `holdfast-common` with the reporter and notifier sinks.
//!
//! - [`SafeOps::safe_call`] / [`SafeOps::safe_query`]: per-attempt timeout,
//!   bounded retry, one-time classification, reporting and notification of
//!   terminal failures, all tuned per call via [`CallOptions`].
//! - [`SafeOps::with_fallback`] / [`SafeOps::safe_execute`] /
//!   [`SafeOps::with_cache`]: graceful degradation into a fallback value.
//! - [`SafeOps::stale_while_revalidate`]: serve cached data immediately,
//!   refresh it in the background.
//! - [`RequestQueue`]: FIFO admission for bursts of writes.

mod fallback;
mod options;
mod request_queue;
mod safe;
mod swr;

use std::sync::Arc;

pub use fallback::FallbackOptions;
pub use options::{CallOptions, DEFAULT_TIMEOUT};
pub use request_queue::RequestQueue;
pub use safe::QueryResult;
pub use swr::SwrOptions;

use crate::notify::Notifier;
use crate::report::ErrorReporter;

/// Guarded-call helper bundle
///
/// Holds the reporter and notifier handles so call sites do not thread
/// them through every call. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SafeOps {
    reporter: Arc<ErrorReporter>,
    notifier: Arc<dyn Notifier>,
}

impl SafeOps {
    pub fn new(reporter: Arc<ErrorReporter>, notifier: Arc<dyn Notifier>) -> Self {
        Self { reporter, notifier }
    }

    pub fn reporter(&self) -> &Arc<ErrorReporter> {
        &self.reporter
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }
}
