//! Caching subsystem.
//!
//! Two independent caches:
//!
//! - [`BoundedCache`]: generic in-memory store with a hard entry bound and
//!   per-entry TTL. Eviction is by insertion age: reads never refresh an
//!   entry, so the victim is always the entry written longest ago. Backs the
//!   chart cache inside [`RenderCoordinator`](crate::render::RenderCoordinator)
//!   and is usable on its own for any derived data.
//!
//! - [`source::CachingSource`]: per-endpoint cache in front of a
//!   [`DataSource`](source::DataSource). Moka-backed, TTL only; it only needs
//!   "don't refetch the same endpoint for a while", not exact eviction order.

pub mod source;

pub use source::{CachingSource, DataSource, SourceConfig};

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::telemetry;

/// Configuration for a [`BoundedCache`].
///
/// ```rust
/// # use citylight::cache::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(50)
///     .ttl(Duration::from_secs(600));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries. Default: 100.
    pub max_entries: usize,
    /// Time-to-live measured from the last write. Default: 5 minutes.
    pub ttl: Duration,
    /// Value of the `cache` label on emitted metrics. Default: "memory".
    pub name: &'static str,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            ttl: Duration::from_secs(300),
            name: "memory",
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of entries.
    pub fn max_entries(mut self, n: usize) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the time-to-live for entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the metrics label for this cache.
    pub fn name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

/// Approximate in-memory footprint of a cached value, in bytes.
///
/// Only used for [`CacheStats::total_size_estimate`]; it never influences
/// eviction.
pub trait EstimateSize {
    fn estimated_size(&self) -> usize;
}

impl EstimateSize for String {
    fn estimated_size(&self) -> usize {
        self.len()
    }
}

impl EstimateSize for Vec<u8> {
    fn estimated_size(&self) -> usize {
        self.len()
    }
}

/// Serialized JSON length, the same measure the dashboard used for its blobs.
impl EstimateSize for serde_json::Value {
    fn estimated_size(&self) -> usize {
        serde_json::to_vec(self).map(|bytes| bytes.len()).unwrap_or(0)
    }
}

impl<T: EstimateSize + ?Sized> EstimateSize for Arc<T> {
    fn estimated_size(&self) -> usize {
        (**self).estimated_size()
    }
}

macro_rules! fixed_size {
    ($($t:ty),*) => {
        $(impl EstimateSize for $t {
            fn estimated_size(&self) -> usize {
                std::mem::size_of::<$t>()
            }
        })*
    };
}

fixed_size!(bool, i32, i64, u32, u64, usize, f32, f64);

/// Read-only snapshot of a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries currently stored (expired entries not yet purged included).
    pub size: usize,
    /// Configured entry bound.
    pub max_size: usize,
    /// Sum of per-entry size estimates, in bytes.
    pub total_size_estimate: usize,
}

impl CacheStats {
    /// Occupancy as `"size/max_size"`.
    pub fn usage(&self) -> String {
        format!("{}/{}", self.size, self.max_size)
    }
}

struct Entry<V> {
    value: V,
    inserted_at: Instant,
    // Write sequence number; breaks ties between equal timestamps.
    seq: u64,
    size: usize,
}

struct Slots<K, V> {
    entries: HashMap<K, Entry<V>>,
    next_seq: u64,
}

/// Bounded key/value store with TTL expiry and insertion-order eviction.
///
/// Thread-safe: every operation takes a single internal lock, so reads and
/// writes are observed in one sequential order. Expired entries are purged
/// lazily, on the read that finds them, on each `set`, or on [`sweep`](Self::sweep);
/// there is no background timer.
///
/// Time comes from [`tokio::time::Instant`], so tests can drive expiry with
/// `tokio::time::pause()` and `advance()`.
pub struct BoundedCache<K, V> {
    slots: Mutex<Slots<K, V>>,
    max_entries: usize,
    ttl: Duration,
    name: &'static str,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + EstimateSize,
{
    /// Create an empty cache from the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            slots: Mutex::new(Slots {
                entries: HashMap::new(),
                next_seq: 0,
            }),
            max_entries: config.max_entries,
            ttl: config.ttl,
            name: config.name,
        }
    }

    /// Insert or overwrite `key`, resetting its age.
    ///
    /// Expired entries are purged first; if the table is still over its
    /// bound afterwards, the entry with the oldest write is evicted.
    pub fn set(&self, key: K, value: V) {
        let now = Instant::now();
        let mut slots = self.lock();
        self.purge_expired(&mut slots, now);

        let seq = slots.next_seq;
        slots.next_seq += 1;
        let size = value.estimated_size();
        slots.entries.insert(
            key,
            Entry {
                value,
                inserted_at: now,
                seq,
                size,
            },
        );

        while slots.entries.len() > self.max_entries {
            let Some(victim) = oldest_key(&slots.entries) else {
                break;
            };
            slots.entries.remove(&victim);
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL,
                "cache" => self.name,
                "reason" => "capacity",
            )
            .increment(1);
            debug!(cache = self.name, max_entries = self.max_entries, "evicted oldest entry");
        }
    }

    /// Look up a live entry. Expired entries are removed and reported absent.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut slots = self.lock();
        let found = self.live(&mut slots, key).map(|entry| entry.value.clone());
        if found.is_some() {
            metrics::counter!(telemetry::CACHE_HITS_TOTAL, "cache" => self.name).increment(1);
        } else {
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "cache" => self.name).increment(1);
        }
        found
    }

    /// Whether a live entry exists. Same expiry semantics as [`get`](Self::get).
    pub fn has<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut slots = self.lock();
        self.live(&mut slots, key).is_some()
    }

    /// Remove `key`. Returns whether an entry (live or expired) was stored.
    pub fn delete<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lock().entries.remove(key).is_some()
    }

    /// Remove every entry whose key matches `pred`. Returns the number removed.
    pub fn delete_matching(&self, pred: impl Fn(&K) -> bool) -> usize {
        let mut slots = self.lock();
        let before = slots.entries.len();
        slots.entries.retain(|k, _| !pred(k));
        before - slots.entries.len()
    }

    /// Evict all entries.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Purge expired entries now. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let mut slots = self.lock();
        self.purge_expired(&mut slots, Instant::now())
    }

    /// Remove and return every live entry, oldest write first. Expired
    /// entries are dropped.
    pub fn drain(&self) -> Vec<(K, V)> {
        let now = Instant::now();
        let mut slots = self.lock();
        let entries = slots
            .entries
            .drain()
            .filter(|(_, entry)| !self.is_expired(entry, now));
        by_write_order(entries)
    }

    /// Remove and return every stored entry, expired or not, oldest write
    /// first. For owners that must release each value they put in.
    pub fn take_all(&self) -> Vec<(K, V)> {
        let mut slots = self.lock();
        by_write_order(slots.entries.drain())
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of occupancy and estimated footprint. No side effects.
    pub fn stats(&self) -> CacheStats {
        let slots = self.lock();
        CacheStats {
            size: slots.entries.len(),
            max_size: self.max_entries,
            total_size_estimate: slots.entries.values().map(|e| e.size).sum(),
        }
    }

    /// Configured entry bound.
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, Slots<K, V>> {
        // No operation leaves the map half-updated, so a poisoned lock is still usable.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, entry: &Entry<V>, now: Instant) -> bool {
        now.saturating_duration_since(entry.inserted_at) > self.ttl
    }

    fn live<'a, Q>(&self, slots: &'a mut Slots<K, V>, key: &Q) -> Option<&'a Entry<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let expired = self.is_expired(slots.entries.get(key)?, Instant::now());
        if expired {
            slots.entries.remove(key);
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL,
                "cache" => self.name,
                "reason" => "expired",
            )
            .increment(1);
            return None;
        }
        slots.entries.get(key)
    }

    fn purge_expired(&self, slots: &mut Slots<K, V>, now: Instant) -> usize {
        let before = slots.entries.len();
        slots
            .entries
            .retain(|_, entry| now.saturating_duration_since(entry.inserted_at) <= self.ttl);
        let removed = before - slots.entries.len();
        if removed > 0 {
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL,
                "cache" => self.name,
                "reason" => "expired",
            )
            .increment(removed as u64);
            debug!(cache = self.name, removed, "purged expired entries");
        }
        removed
    }
}

fn by_write_order<K, V>(entries: impl Iterator<Item = (K, Entry<V>)>) -> Vec<(K, V)> {
    let mut ordered: Vec<(u64, K, V)> = entries
        .map(|(k, entry)| (entry.seq, k, entry.value))
        .collect();
    ordered.sort_by_key(|(seq, _, _)| *seq);
    ordered.into_iter().map(|(_, k, v)| (k, v)).collect()
}

/// Key of the entry with the oldest write (smallest timestamp, then sequence).
fn oldest_key<K: Clone, V>(entries: &HashMap<K, Entry<V>>) -> Option<K> {
    entries
        .iter()
        .min_by_key(|(_, entry)| (entry.inserted_at, entry.seq))
        .map(|(k, _)| k.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(max: usize, ttl_ms: u64) -> BoundedCache<String, i32> {
        BoundedCache::new(
            &CacheConfig::new()
                .max_entries(max)
                .ttl(Duration::from_millis(ttl_ms)),
        )
    }

    #[test]
    fn oldest_key_prefers_lower_sequence_on_equal_timestamps() {
        let now = Instant::now();
        let mut entries = HashMap::new();
        for (k, seq) in [("b", 2), ("a", 1), ("c", 3)] {
            entries.insert(
                k.to_string(),
                Entry {
                    value: 0,
                    inserted_at: now,
                    seq,
                    size: 0,
                },
            );
        }
        assert_eq!(oldest_key(&entries).as_deref(), Some("a"));
    }

    #[test]
    fn oldest_key_of_empty_map_is_none() {
        let entries: HashMap<String, Entry<i32>> = HashMap::new();
        assert!(oldest_key(&entries).is_none());
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let c = cache(0, 1_000);
        c.set("a".into(), 1);
        assert!(c.is_empty());
        assert!(c.get("a").is_none());
    }

    #[test]
    fn stats_sum_size_estimates() {
        let c = cache(10, 1_000);
        c.set("a".into(), 1);
        c.set("b".into(), 2);
        let stats = c.stats();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.max_size, 10);
        assert_eq!(stats.total_size_estimate, 2 * std::mem::size_of::<i32>());
        assert_eq!(stats.usage(), "2/10");
    }

    #[test]
    fn json_size_is_serialized_length() {
        let v = serde_json::json!({"a": [1, 2, 3]});
        assert_eq!(v.estimated_size(), r#"{"a":[1,2,3]}"#.len());
    }

    #[test]
    fn config_builder_pattern() {
        let config = CacheConfig::new()
            .max_entries(7)
            .ttl(Duration::from_secs(9))
            .name("chart");
        assert_eq!(config.max_entries, 7);
        assert_eq!(config.ttl, Duration::from_secs(9));
        assert_eq!(config.name, "chart");
    }
}
