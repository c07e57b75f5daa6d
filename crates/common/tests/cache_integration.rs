//! Integration tests for the TTL cache under realistic usage
//!
//! Expiry is driven through `MockClock`; concurrency through real threads,
//! since the cache is a synchronous structure shared across tasks.

use std::sync::Arc;
use std::time::Duration;

use holdfast_common::{Cache, MockClock};

#[derive(Debug, Clone, PartialEq)]
struct Profile {
    name: String,
    revision: u32,
}

/// A cache shared between a reader and a writer thread stays coherent:
/// every read observes either the old or the new revision, never a torn
/// value.
#[test]
fn concurrent_readers_and_writers() {
    let cache: Arc<Cache<Profile>> = Arc::new(Cache::new(Duration::from_secs(60)));
    cache.insert("profile", Profile { name: "ada".into(), revision: 0 });

    let writer = {
        let cache = Arc::clone(&cache);
        std::thread::spawn(move || {
            for revision in 1..=100 {
                cache.insert("profile", Profile { name: "ada".into(), revision });
            }
        })
    };

    let reader = {
        let cache = Arc::clone(&cache);
        std::thread::spawn(move || {
            for _ in 0..100 {
                let profile = cache.get("profile").expect("never expires during the test");
                assert_eq!(profile.name, "ada");
                assert!(profile.revision <= 100);
            }
        })
    };

    writer.join().expect("writer thread");
    reader.join().expect("reader thread");
    assert_eq!(cache.get("profile").expect("still present").revision, 100);
}

/// Mixed-age entries: only the ones past their TTL read as absent, and
/// each expired entry disappears with the read that observed it.
#[test]
fn mixed_age_entries_expire_independently() {
    let clock = MockClock::new();
    let cache: Cache<u32, _> = Cache::with_clock(Duration::from_secs(30), clock.clone());

    cache.insert("old", 1);
    clock.advance(Duration::from_secs(20));
    cache.insert("young", 2);
    clock.advance(Duration::from_secs(15));

    // "old" is now 35s old, "young" only 15s.
    assert_eq!(cache.get("old"), None);
    assert_eq!(cache.get("young"), Some(2));
    assert_eq!(cache.len(), 1);
}

/// A full clear leaves no entries behind, fresh or expired.
#[test]
fn clear_removes_everything() {
    let clock = MockClock::new();
    let cache: Cache<&str, _> = Cache::with_clock(Duration::from_secs(1), clock.clone());

    cache.insert("fresh", "a");
    clock.advance(Duration::from_secs(5));
    cache.insert("newer", "b");
    cache.clear();

    assert!(cache.is_empty());
    assert_eq!(cache.get("fresh"), None);
    assert_eq!(cache.get("newer"), None);
}

/// Re-inserting after expiry behaves like a first insert.
#[test]
fn reinsert_after_expiry() {
    let clock = MockClock::new();
    let cache: Cache<u32, _> = Cache::with_clock(Duration::from_secs(10), clock.clone());

    cache.insert("k", 1);
    clock.advance(Duration::from_secs(11));
    assert_eq!(cache.get("k"), None);

    cache.insert("k", 2);
    assert_eq!(cache.get("k"), Some(2));
    clock.advance(Duration::from_secs(10));
    assert_eq!(cache.get("k"), Some(2), "new entry carries its own age");
}
