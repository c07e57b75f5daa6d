//! TTL-bounded key/value cache with lazy eviction
//!
//! A [`Cache`] owns all of its entries exclusively; values are handed out
//! by clone and there is no external aliasing of stored entries. An entry
//! is considered expired once its age exceeds the configured TTL, and
//! expired entries are treated as absent and evicted lazily on the read
//! that observes them.
//!
//! The cache is cheap to clone (clones share the same storage), which is
//! what lets the stale-while-revalidate helper hand a handle to a
//! background refresh task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::time::{Clock, SystemClock};

/// Default entry lifetime: five minutes
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Entry stored in the cache
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    stored_at: Instant,
}

/// TTL-bounded key→value store
///
/// # Type Parameters
/// - `T`: Value type (must be `Clone`)
/// - `C`: Clock for expiry checks (defaults to [`SystemClock`])
#[derive(Debug)]
pub struct Cache<T, C = SystemClock>
where
    T: Clone,
    C: Clock,
{
    entries: Arc<RwLock<HashMap<String, CacheEntry<T>>>>,
    ttl: Duration,
    clock: C,
}

impl<T, C> Clone for Cache<T, C>
where
    T: Clone,
    C: Clock + Clone,
{
    fn clone(&self) -> Self {
        Self { entries: Arc::clone(&self.entries), ttl: self.ttl, clock: self.clock.clone() }
    }
}

impl<T> Cache<T, SystemClock>
where
    T: Clone,
{
    /// Create a cache with the given TTL using the system clock
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl<T> Default for Cache<T, SystemClock>
where
    T: Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<T, C> Cache<T, C>
where
    T: Clone,
    C: Clock,
{
    /// Create a cache with a custom clock (useful for testing)
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self { entries: Arc::new(RwLock::new(HashMap::new())), ttl, clock }
    }

    /// Get a value from the cache
    ///
    /// Returns `None` if the key is absent or the entry's age exceeds the
    /// TTL; an expired entry is evicted by the read that observes it.
    pub fn get(&self, key: &str) -> Option<T> {
        let mut entries = self.entries.write();

        let expired = match entries.get(key) {
            Some(entry) => self.clock.now().duration_since(entry.stored_at) > self.ttl,
            None => return None,
        };

        if expired {
            entries.remove(key);
            return None;
        }

        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Insert a value, overwriting any previous entry for the key
    pub fn insert(&self, key: impl Into<String>, value: T) {
        let entry = CacheEntry { value, stored_at: self.clock.now() };
        self.entries.write().insert(key.into(), entry);
    }

    /// Remove an entry, returning its value if it was present
    pub fn remove(&self, key: &str) -> Option<T> {
        self.entries.write().remove(key).map(|entry| entry.value)
    }

    /// Clear all entries
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of stored entries, including not-yet-evicted expired ones
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The configured entry lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
