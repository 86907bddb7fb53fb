//! TTL key/value stores shared by table engines

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::trace;

use crate::lru::LruCache;
use crate::stats::StoreStats;

/// Type-erased cached value; engines downcast to their own index types
pub type CacheValue = Arc<dyn Any + Send + Sync>;

/// Process-wide key/value store with per-entry expiry
///
/// A missing entry may have expired, been evicted or never been written;
/// callers must treat all three the same way.
pub trait CacheStore: Send + Sync {
    /// Return the entry for `key` if it is present and not expired
    fn try_get(&self, key: &str) -> Option<CacheValue>;

    /// Store `value` under `key` for `ttl`
    fn set(&self, key: &str, value: CacheValue, ttl: Duration);

    /// Store several entries with one shared expiry
    ///
    /// Implementations should apply the batch atomically so readers never see
    /// part of it. The default writes entries one by one.
    fn set_many(&self, entries: Vec<(String, CacheValue)>, ttl: Duration) {
        for (key, value) in entries {
            self.set(&key, value, ttl);
        }
    }

    /// Remove `key`; returns whether an entry was present
    fn remove(&self, key: &str) -> bool;
}

struct Entry {
    value: CacheValue,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-memory [`CacheStore`] bounded by entry count
///
/// Expired entries are dropped lazily on access or by
/// [`purge_expired`](MemoryStore::purge_expired); when full, the least
/// recently used entry is evicted.
pub struct MemoryStore {
    entries: Mutex<LruCache<String, Entry>>,
    stats: StoreStats,
}

impl MemoryStore {
    /// Create a store holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            stats: StoreStats::default(),
        }
    }

    /// Number of entries currently held, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.entries.lock().capacity()
    }

    /// Drop every expired entry; returns how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let purged = self.entries.lock().retain(|_, entry| entry.is_live(now));
        self.stats.record_expirations(purged as u64);
        purged
    }

    /// Drop everything
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Store counters
    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    fn insert_locked(&self, entries: &mut LruCache<String, Entry>, key: String, entry: Entry) {
        if let Some((evicted, _)) = entries.insert(key, entry) {
            trace!(key = %evicted, "Evicted cache entry");
            self.stats.record_eviction();
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(crate::TableCacheConfig::DEFAULT_CAPACITY)
    }
}

impl CacheStore for MemoryStore {
    fn try_get(&self, key: &str) -> Option<CacheValue> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        let live = entries.get(key).map(|entry| entry.is_live(now))?;
        if live {
            return entries.get(key).map(|entry| entry.value.clone());
        }

        entries.remove(key);
        self.stats.record_expirations(1);
        None
    }

    fn set(&self, key: &str, value: CacheValue, ttl: Duration) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        let mut entries = self.entries.lock();
        self.insert_locked(&mut entries, key.to_string(), entry);
    }

    fn set_many(&self, batch: Vec<(String, CacheValue)>, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        let mut entries = self.entries.lock();
        for (key, value) in batch {
            self.insert_locked(&mut entries, key, Entry { value, expires_at });
        }
    }

    fn remove(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }
}
