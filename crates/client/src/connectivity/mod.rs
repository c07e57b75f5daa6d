//! Connectivity tracking
//!
//! The [`ConnectivityMonitor`] is the single process-wide observer of the
//! platform's online/offline signal. Subscribers are invoked immediately
//! with the current state when they subscribe (so they never have to query
//! separately), and transition notifications are delivered synchronously,
//! in subscription order, within a single notification pass.
//!
//! `was_offline` is sticky across an outage and consumed by the first
//! online notification after it, so a "connection restored" message can
//! fire exactly once per outage even when the platform emits redundant
//! online events.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

/// Snapshot delivered to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityState {
    pub is_online: bool,
    /// True on the first online notification after an outage, and while
    /// offline; false on redundant online events
    pub was_offline: bool,
}

type Listener = Arc<dyn Fn(ConnectivityState) + Send + Sync>;

#[derive(Debug)]
struct MonitorState {
    is_online: bool,
    /// Sticky across an outage, consumed by the first online notification
    was_offline: bool,
}

struct MonitorInner {
    state: Mutex<MonitorState>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
    destroyed: AtomicBool,
}

impl std::fmt::Debug for MonitorInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorInner")
            .field("state", &*self.state.lock())
            .field("listeners", &self.listeners.lock().len())
            .field("destroyed", &self.destroyed.load(Ordering::Relaxed))
            .finish()
    }
}

/// Process-wide connectivity monitor
///
/// Constructed once at startup, fed by the platform's online/offline
/// signal through [`set_online`](Self::set_online), torn down explicitly
/// via [`destroy`](Self::destroy).
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<MonitorInner>,
}

/// Subscription handle; dropping it (or calling
/// [`unsubscribe`](Self::unsubscribe)) removes the listener
pub struct Subscription {
    inner: Weak<MonitorInner>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.listeners.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

impl ConnectivityMonitor {
    /// Create a monitor; the initial state is online unless told otherwise
    pub fn new() -> Self {
        Self::with_initial(true)
    }

    /// Create a monitor with an explicit initial online state
    pub fn with_initial(is_online: bool) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                state: Mutex::new(MonitorState { is_online, was_offline: !is_online }),
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                destroyed: AtomicBool::new(false),
            }),
        }
    }

    /// Subscribe to connectivity transitions
    ///
    /// The listener is invoked immediately with the current state, then on
    /// every subsequent transition, in subscription order.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(ConnectivityState) + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(listener);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        let snapshot = {
            let state = self.inner.state.lock();
            ConnectivityState { is_online: state.is_online, was_offline: state.was_offline }
        };
        listener(snapshot);

        self.inner.listeners.lock().push((id, Arc::clone(&listener)));
        Subscription { inner: Arc::downgrade(&self.inner), id }
    }

    /// The last known online state
    pub fn status(&self) -> bool {
        self.inner.state.lock().is_online
    }

    /// Platform signal inlet: record a transition and fan it out
    ///
    /// Redundant events (same state as before) are still delivered for
    /// online, but with `was_offline` already consumed; offline keeps the
    /// sticky flag set.
    pub fn set_online(&self, online: bool) {
        if self.inner.destroyed.load(Ordering::Relaxed) {
            return;
        }

        let snapshot = {
            let mut state = self.inner.state.lock();
            if online {
                let was_offline = state.was_offline;
                state.is_online = true;
                // Consumed: the next online event reads as redundant.
                state.was_offline = false;
                ConnectivityState { is_online: true, was_offline }
            } else {
                state.is_online = false;
                state.was_offline = true;
                ConnectivityState { is_online: false, was_offline: true }
            }
        };

        debug!(
            is_online = snapshot.is_online,
            was_offline = snapshot.was_offline,
            "connectivity transition"
        );
        self.notify(snapshot);
    }

    fn notify(&self, snapshot: ConnectivityState) {
        // Snapshot the listeners so a listener may subscribe/unsubscribe
        // re-entrantly without deadlocking the pass.
        let listeners: Vec<Listener> = {
            let guard = self.inner.listeners.lock();
            guard.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for listener in listeners {
            listener(snapshot);
        }
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    /// Tear down: drop all listeners and ignore further signals; idempotent
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.listeners.lock().clear();
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}
