//! Composition root
//!
//! [`Services`] owns every resilience service and wires them in the one
//! order that works: reporter and notifier first (everything logs through
//! them), then the connectivity monitor, then the offline queue — the
//! monitor must exist before the queue subscribes to it. Teardown is
//! explicit and idempotent via [`Services::shutdown`].
//!
//! The monitor subscription installed here is also where the user-facing
//! connectivity behavior lives: a warning toast when the connection drops,
//! a one-shot "connection restored" toast plus a queue drain when it
//! returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use holdfast_common::{AppError, ErrorKind};

use crate::connectivity::{ConnectivityMonitor, Subscription};
use crate::flags::FeatureFlags;
use crate::notify::{Notifier, TracingNotifier};
use crate::ops::SafeOps;
use crate::queue::{OfflineQueue, QueueConfig, QueueStore, QueuedCommand};
use crate::report::{ErrorReporter, ReportSink, ReporterConfig, TracingSink};

/// Builder for [`Services`]
pub struct ServicesBuilder {
    sink: Arc<dyn ReportSink>,
    notifier: Arc<dyn Notifier>,
    store: Option<Arc<dyn QueueStore>>,
    reporter_config: ReporterConfig,
    queue_config: QueueConfig,
    initially_online: bool,
}

impl Default for ServicesBuilder {
    fn default() -> Self {
        Self {
            sink: Arc::new(TracingSink),
            notifier: Arc::new(TracingNotifier),
            store: None,
            reporter_config: ReporterConfig::default(),
            queue_config: QueueConfig::default(),
            initially_online: true,
        }
    }
}

impl ServicesBuilder {
    pub fn report_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Durable queue storage; without one, the queue lives in memory only
    pub fn queue_store(mut self, store: Arc<dyn QueueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn reporter_config(mut self, config: ReporterConfig) -> Self {
        self.reporter_config = config;
        self
    }

    pub fn queue_config(mut self, config: QueueConfig) -> Self {
        self.queue_config = config;
        self
    }

    /// Initial connectivity state, before the first platform signal
    pub fn initially_online(mut self, online: bool) -> Self {
        self.initially_online = online;
        self
    }

    /// Construct and start the service stack
    ///
    /// Requires a running tokio runtime (the reporter flush task and queue
    /// drains are spawned onto it).
    pub async fn start(self) -> Services {
        Services::start(self).await
    }
}

/// The assembled resilience layer
///
/// Constructed once at startup; all consumers hold handles to the pieces
/// they need rather than reaching for ambient globals.
pub struct Services {
    reporter: Arc<ErrorReporter>,
    notifier: Arc<dyn Notifier>,
    monitor: ConnectivityMonitor,
    queue: Arc<OfflineQueue>,
    flags: Arc<FeatureFlags>,
    ops: SafeOps,
    transition_sub: Mutex<Option<Subscription>>,
    shutdown: AtomicBool,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("online", &self.monitor.status())
            .field("queued", &self.queue.len())
            .field("shutdown", &self.shutdown.load(Ordering::Relaxed))
            .finish()
    }
}

impl Services {
    pub fn builder() -> ServicesBuilder {
        ServicesBuilder::default()
    }

    async fn start(builder: ServicesBuilder) -> Self {
        let reporter = Arc::new(ErrorReporter::with_config(
            builder.sink,
            builder.reporter_config,
        ));
        reporter.start();
        let notifier = builder.notifier;

        // Construction order matters: the queue consults the monitor
        // mid-drain and the transition subscription drives it, so the
        // monitor exists first.
        let monitor = ConnectivityMonitor::with_initial(builder.initially_online);

        let store = builder
            .store
            .unwrap_or_else(|| Arc::new(crate::queue::MemoryStore::new()) as Arc<dyn QueueStore>);
        let queue = Arc::new(
            OfflineQueue::new(store, monitor.clone())
                .with_reporter(Arc::clone(&reporter))
                .with_notifier(Arc::clone(&notifier))
                .with_config(builder.queue_config),
        );
        if let Err(err) = queue.restore().await {
            warn!(error = %err, "failed to restore persisted offline queue");
        }

        let transition_sub = {
            let notifier = Arc::clone(&notifier);
            let queue = Arc::clone(&queue);
            monitor.subscribe(move |state| {
                if state.is_online && state.was_offline {
                    notifier.show_success("Connection restored.");
                    spawn_drain(&queue);
                } else if !state.is_online {
                    notifier.show_warning("Connection lost. Some features may be limited.");
                }
            })
        };

        // Anything persisted from a previous run replays as soon as we are
        // online; there may never be another online transition to trigger
        // it.
        if builder.initially_online && !queue.is_empty() {
            spawn_drain(&queue);
        }

        let ops = SafeOps::new(Arc::clone(&reporter), Arc::clone(&notifier));

        Self {
            reporter,
            notifier,
            monitor,
            queue,
            flags: Arc::new(FeatureFlags::new()),
            ops,
            transition_sub: Mutex::new(Some(transition_sub)),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Platform signal inlet: forward online/offline transitions
    pub fn set_online(&self, online: bool) {
        self.monitor.set_online(online);
    }

    /// Execute a side-effecting command now, or defer it
    ///
    /// Offline submissions are queued immediately; an online submission
    /// that fails with a network-classified error is queued for replay,
    /// and any other failure is reported, surfaced, and returned.
    pub async fn submit(&self, command: QueuedCommand) -> Result<(), AppError> {
        if !self.monitor.status() {
            self.queue.enqueue(command).await;
            return Ok(());
        }

        match self.queue.execute_now(&command).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind == ErrorKind::Network => {
                debug!(target = %command.target, "online submission hit a network error, queueing");
                self.queue.enqueue(command).await;
                Ok(())
            }
            Err(error) => {
                self.reporter.report(&error, None).await;
                self.notifier.show_error(&error);
                Err(error)
            }
        }
    }

    pub fn ops(&self) -> &SafeOps {
        &self.ops
    }

    pub fn flags(&self) -> &Arc<FeatureFlags> {
        &self.flags
    }

    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    pub fn queue(&self) -> &Arc<OfflineQueue> {
        &self.queue
    }

    pub fn reporter(&self) -> &Arc<ErrorReporter> {
        &self.reporter
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Tear the stack down: final report flush, monitor teardown,
    /// transition subscription dropped; idempotent
    pub async fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        self.transition_sub.lock().take();
        self.monitor.destroy();
        self.reporter.shutdown().await;
    }
}

fn spawn_drain(queue: &Arc<OfflineQueue>) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            let queue = Arc::clone(queue);
            handle.spawn(async move {
                queue.drain().await;
            });
        }
        Err(_) => {
            warn!("online transition outside the runtime; queue drain deferred");
        }
    }
}
