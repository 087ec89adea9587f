//! Tests for [`BoundedCache`]: capacity bound, TTL expiry, insertion-order eviction.

use std::time::Duration;

use citylight::cache::{BoundedCache, CacheConfig};
use tokio::time::advance;

fn cache(max: usize, ttl_ms: u64) -> BoundedCache<String, i32> {
    BoundedCache::new(
        &CacheConfig::new()
            .max_entries(max)
            .ttl(Duration::from_millis(ttl_ms)),
    )
}

async fn tick(ms: u64) {
    advance(Duration::from_millis(ms)).await;
}

// =========================================================================
// Capacity
// =========================================================================

#[tokio::test(start_paused = true)]
async fn oldest_write_is_evicted_at_capacity() {
    let c = cache(2, 1_000);
    c.set("a".into(), 1);
    tick(10).await;
    c.set("b".into(), 2);
    tick(10).await;
    c.set("c".into(), 3);

    assert_eq!(c.get("a"), None);
    assert_eq!(c.get("b"), Some(2));
    assert_eq!(c.get("c"), Some(3));
}

#[tokio::test(start_paused = true)]
async fn size_never_exceeds_bound() {
    let c = cache(5, 60_000);
    for i in 0..40 {
        c.set(format!("k{i}"), i);
        assert!(c.len() <= 5, "len {} after insert {i}", c.len());
        tick(1).await;
    }
    // The five most recent writes survive.
    for i in 35..40 {
        assert_eq!(c.get(format!("k{i}").as_str()), Some(i));
    }
    assert!(!c.has("k34"));
}

#[tokio::test(start_paused = true)]
async fn reads_do_not_refresh_age() {
    let c = cache(2, 1_000);
    c.set("a".into(), 1);
    tick(10).await;
    c.set("b".into(), 2);
    tick(10).await;

    // Reading "a" does not protect it: eviction follows write order.
    assert_eq!(c.get("a"), Some(1));
    assert!(c.has("a"));
    c.set("c".into(), 3);

    assert!(!c.has("a"));
    assert!(c.has("b"));
}

#[tokio::test(start_paused = true)]
async fn overwrite_refreshes_age() {
    let c = cache(2, 1_000);
    c.set("a".into(), 1);
    tick(10).await;
    c.set("b".into(), 2);
    tick(10).await;
    c.set("a".into(), 10);
    tick(10).await;
    c.set("c".into(), 3);

    assert_eq!(c.get("a"), Some(10));
    assert_eq!(c.get("b"), None);
    assert_eq!(c.get("c"), Some(3));
}

#[tokio::test(start_paused = true)]
async fn overwrite_at_capacity_evicts_nothing() {
    let c = cache(2, 1_000);
    c.set("a".into(), 1);
    c.set("b".into(), 2);
    c.set("b".into(), 20);

    assert_eq!(c.len(), 2);
    assert_eq!(c.get("a"), Some(1));
    assert_eq!(c.get("b"), Some(20));
}

#[tokio::test(start_paused = true)]
async fn equal_timestamps_evict_first_written() {
    // Paused clock without advancing: every write has the same instant.
    let c = cache(2, 1_000);
    c.set("x".into(), 1);
    c.set("y".into(), 2);
    c.set("z".into(), 3);

    assert!(!c.has("x"));
    assert!(c.has("y"));
    assert!(c.has("z"));
}

// =========================================================================
// Expiry
// =========================================================================

#[tokio::test(start_paused = true)]
async fn entry_expires_after_ttl() {
    let c = cache(10, 1_000);
    c.set("a".into(), 1);

    tick(1_000).await;
    assert_eq!(c.get("a"), Some(1), "age == ttl is still live");

    tick(1).await;
    assert_eq!(c.get("a"), None);
    // The expired read removed it.
    assert_eq!(c.len(), 0);
}

#[tokio::test(start_paused = true)]
async fn has_applies_expiry() {
    let c = cache(10, 100);
    c.set("a".into(), 1);
    tick(101).await;
    assert!(!c.has("a"));
    assert!(c.is_empty());
}

#[tokio::test(start_paused = true)]
async fn set_purges_expired_entries() {
    let c = cache(10, 100);
    c.set("a".into(), 1);
    c.set("b".into(), 2);
    tick(150).await;
    c.set("c".into(), 3);

    assert_eq!(c.len(), 1);
    assert_eq!(c.stats().size, 1);
}

#[tokio::test(start_paused = true)]
async fn expired_entries_make_room_before_eviction() {
    let c = cache(2, 100);
    c.set("old".into(), 1);
    tick(50).await;
    c.set("mid".into(), 2);
    tick(60).await;
    // "old" is expired (110ms), "mid" is live (60ms): purge frees the slot.
    c.set("new".into(), 3);

    assert!(c.has("mid"));
    assert!(c.has("new"));
}

#[tokio::test(start_paused = true)]
async fn sweep_counts_removed_entries() {
    let c = cache(10, 100);
    c.set("a".into(), 1);
    c.set("b".into(), 2);
    tick(60).await;
    c.set("c".into(), 3);
    tick(60).await;

    assert_eq!(c.sweep(), 2);
    assert_eq!(c.len(), 1);
    assert_eq!(c.sweep(), 0);
}

#[tokio::test(start_paused = true)]
async fn stats_have_no_side_effects() {
    let c = cache(10, 100);
    c.set("a".into(), 1);
    tick(200).await;

    // Expired but not yet purged.
    assert_eq!(c.stats().size, 1);
    assert_eq!(c.stats().size, 1);
}

// =========================================================================
// Removal
// =========================================================================

#[test]
fn delete_and_clear_remove_entries() {
    let c = cache(10, 60_000);
    c.set("a".into(), 1);
    c.set("b".into(), 2);

    assert!(c.delete("a"));
    assert!(!c.delete("a"));
    assert_eq!(c.get("a"), None);

    c.clear();
    assert_eq!(c.get("b"), None);
    assert!(c.is_empty());
}

#[test]
fn delete_matching_removes_prefix() {
    let c = cache(10, 60_000);
    c.set("night:districts".into(), 1);
    c.set("night:hours".into(), 2);
    c.set("hotpot:density".into(), 3);

    assert_eq!(c.delete_matching(|k| k.starts_with("night:")), 2);
    assert!(c.has("hotpot:density"));
    assert!(!c.has("night:hours"));
}

#[tokio::test(start_paused = true)]
async fn drain_returns_live_entries_oldest_first() {
    let c = cache(10, 100);
    c.set("stale".into(), 0);
    tick(80).await;
    c.set("b".into(), 2);
    tick(10).await;
    c.set("a".into(), 1);
    tick(30).await;

    let drained = c.drain();
    assert_eq!(drained, vec![("b".to_string(), 2), ("a".to_string(), 1)]);
    assert!(c.is_empty());
}

#[tokio::test(start_paused = true)]
async fn take_all_includes_expired_entries() {
    let c = cache(10, 100);
    c.set("stale".into(), 0);
    tick(150).await;
    c.set("fresh".into(), 1);
    // set purged "stale"; add another entry that will expire before take_all
    tick(50).await;
    c.set("aging".into(), 2);
    tick(120).await;

    let taken = c.take_all();
    assert_eq!(taken, vec![("fresh".to_string(), 1), ("aging".to_string(), 2)]);
    assert!(c.is_empty());
}

// =========================================================================
// Concurrency
// =========================================================================

#[test]
fn thread_safety() {
    use std::sync::Arc;
    use std::thread;

    let c = Arc::new(cache(8, 60_000));
    let mut handles = Vec::new();

    for t in 0..8 {
        let c = Arc::clone(&c);
        handles.push(thread::spawn(move || {
            for i in 0..100 {
                c.set(format!("t{t}-{i}"), i);
                let _ = c.get(format!("t{t}-{}", i / 2).as_str());
                assert!(c.len() <= 8);
            }
        }));
    }

    for h in handles {
        h.join().expect("thread panicked");
    }
    assert_eq!(c.len(), 8);
}
