//! Cache Core Module
//!
//! Single-threaded cache engine. Keeps the entry store and the recency list in
//! lock-step; every method leaves both holding exactly the same keys.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::cache::{eviction, CacheEntry, CacheStats, EntryStore, Expiry, RecencyList};
use crate::config::{CacheConfig, MaxAge, SweepMode};
use crate::error::{CacheError, Result};

/// Upper bound on slots reserved up front, whatever the capacity.
const PREALLOC_LIMIT: usize = 4096;

// == Cache Core ==
/// Entry store, recency list and counters behind the cache lock.
#[derive(Debug)]
pub struct CacheCore<V> {
    store: EntryStore,
    list: RecencyList<V>,
    stats: CacheStats,
    capacity: usize,
    eviction_count: usize,
    default_max_age: MaxAge,
    sweep_mode: SweepMode,
}

impl<V: Clone> CacheCore<V> {
    // == Constructor ==
    /// Builds an empty core. The config is expected to be validated already.
    pub fn new(config: &CacheConfig) -> Self {
        let prealloc = config.capacity.min(PREALLOC_LIMIT);
        Self {
            store: EntryStore::with_capacity(prealloc),
            list: RecencyList::with_capacity(prealloc),
            stats: CacheStats::new(),
            capacity: config.capacity,
            eviction_count: config.eviction_count(),
            default_max_age: config.default_max_age,
            sweep_mode: config.sweep_mode,
        }
    }

    // == Put ==
    /// Stores a value, replacing any entry already under `key`.
    ///
    /// A new key arriving at a full cache first evicts the least recently used
    /// fraction of entries.
    pub fn put(&mut self, key: &str, value: Option<V>, max_age: MaxAge, now: Instant) -> Result<()> {
        let value = value.ok_or_else(|| CacheError::NullValue(key.to_string()))?;

        if self.unlink(key).is_none() && self.store.len() >= self.capacity {
            let count = self.eviction_count;
            let evicted = eviction::evict_lru(self, count);
            debug!("Capacity eviction: removed {} entries", evicted);
        }

        let expire_at = Expiry::resolve(now, max_age, self.default_max_age);
        let node = self
            .list
            .add_first(CacheEntry::new(key.to_string(), value, expire_at));
        self.store.insert(key.to_string(), node);

        self.stats.set_total_entries(self.store.len());
        Ok(())
    }

    // == Get ==
    /// Returns the value for `key` and marks it most recently used.
    ///
    /// An entry found expired is removed on the spot and reported as not found.
    pub fn get(&mut self, key: &str, now: Instant) -> Result<V> {
        let node = match self.store.get(key) {
            Some(node) => node,
            None => {
                self.stats.record_miss();
                return Err(CacheError::NotFound(key.to_string()));
            }
        };

        let expired = self.list.get(node).map_or(true, |entry| entry.is_expired(now));
        if expired {
            self.unlink(key);
            self.stats.record_miss();
            self.stats.record_expirations(1);
            debug!("Lazy expiry: removed {}", key);
            return Err(CacheError::NotFound(key.to_string()));
        }

        self.list.move_to_front(node);
        self.stats.record_hit();
        match self.list.get(node) {
            Some(entry) => Ok(entry.value().clone()),
            None => Err(CacheError::NotFound(key.to_string())),
        }
    }

    // == Invalidate ==
    /// Removes `key`, failing if it is not cached.
    pub fn invalidate(&mut self, key: &str) -> Result<()> {
        match self.unlink(key) {
            Some(_) => Ok(()),
            None => Err(CacheError::NotFound(key.to_string())),
        }
    }

    /// Drops every entry. Calling it on an empty cache is a no-op.
    pub fn invalidate_all(&mut self) {
        self.list.clear();
        self.store.clear();
        self.stats.set_total_entries(0);
    }

    // == Time To Live ==
    /// Remaining lifetime of a live entry, None when it never expires.
    ///
    /// Does not change recency.
    pub fn time_to_live(&self, key: &str, now: Instant) -> Result<Option<Duration>> {
        self.store
            .get(key)
            .and_then(|node| self.list.get(node))
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.expire_at().remaining(now))
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    // == Sweep ==
    /// Runs an expiry sweep with the configured mode.
    pub fn sweep_expired(&mut self, now: Instant) -> usize {
        let mode = self.sweep_mode;
        let removed = eviction::sweep_expired(self, now, mode);
        self.stats.record_expirations(removed);
        removed
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.store.contains(key)
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<String> {
        self.list.iter().map(|entry| entry.key().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.store.len());
        stats
    }

    // == Eviction Primitives ==
    /// Removes `key` from both structures. Absent keys are ignored.
    pub(crate) fn unlink(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let node = self.store.remove(key)?;
        let entry = self.list.remove(node);
        self.stats.set_total_entries(self.store.len());
        entry
    }

    /// Removes the least recently used entry from both structures.
    pub(crate) fn pop_lru(&mut self) -> Option<CacheEntry<V>> {
        let entry = self.list.remove_last()?;
        self.store.remove(entry.key());
        self.stats.record_evictions(1);
        self.stats.set_total_entries(self.store.len());
        Some(entry)
    }

    /// Keys whose entries are expired at `now`, stopping after `limit`.
    pub(crate) fn expired_keys(&self, now: Instant, limit: usize) -> Vec<String> {
        self.store
            .keys()
            .filter(|key| {
                self.store
                    .get(key)
                    .and_then(|node| self.list.get(node))
                    .is_some_and(|entry| entry.is_expired(now))
            })
            .take(limit)
            .cloned()
            .collect()
    }

    /// True when both structures agree on membership and size.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        self.store.len() == self.list.len()
            && self.list.iter().all(|entry| {
                self.store
                    .get(entry.key())
                    .and_then(|node| self.list.get(node))
                    .is_some_and(|stored| stored.key() == entry.key())
            })
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn core(capacity: usize, factor: f64) -> CacheCore<String> {
        let config = CacheConfig::default()
            .with_capacity(capacity)
            .with_eviction_factor(factor);
        CacheCore::new(&config)
    }

    fn put(core: &mut CacheCore<String>, key: &str, now: Instant) {
        core.put(key, Some(key.to_uppercase()), MaxAge::Forever, now)
            .unwrap();
    }

    #[test]
    fn test_core_put_and_get() {
        let mut core = core(10, 0.25);
        let now = Instant::now();
        put(&mut core, "a", now);

        assert_eq!(core.get("a", now).unwrap(), "A");
        assert_eq!(core.len(), 1);
        assert!(core.is_consistent());
    }

    #[test]
    fn test_core_get_missing() {
        let mut core = core(10, 0.25);
        let result = core.get("nope", Instant::now());
        assert_eq!(result, Err(CacheError::NotFound("nope".to_string())));
        assert_eq!(core.stats().misses, 1);
    }

    #[test]
    fn test_core_null_value_rejected() {
        let mut core = core(10, 0.25);
        let now = Instant::now();
        put(&mut core, "a", now);

        let result = core.put("b", None, MaxAge::Forever, now);
        assert_eq!(result, Err(CacheError::NullValue("b".to_string())));
        assert_eq!(core.keys(), vec!["a"]);

        // Null for an existing key leaves the old entry alone
        assert!(core.put("a", None, MaxAge::Forever, now).is_err());
        assert_eq!(core.get("a", now).unwrap(), "A");
    }

    #[test]
    fn test_core_replace_moves_to_head() {
        let mut core = core(10, 0.25);
        let now = Instant::now();
        put(&mut core, "a", now);
        put(&mut core, "b", now);
        core.put("a", Some("second".to_string()), MaxAge::Forever, now)
            .unwrap();

        assert_eq!(core.len(), 2);
        assert_eq!(core.keys(), vec!["a", "b"]);
        assert_eq!(core.get("a", now).unwrap(), "second");
        assert!(core.is_consistent());
    }

    #[test]
    fn test_core_replace_at_capacity_does_not_evict() {
        let mut core = core(2, 0.5);
        let now = Instant::now();
        put(&mut core, "a", now);
        put(&mut core, "b", now);
        put(&mut core, "a", now);

        assert_eq!(core.len(), 2);
        assert_eq!(core.stats().evictions, 0);
    }

    #[test]
    fn test_core_capacity_eviction_fraction() {
        let mut core = core(4, 0.5);
        let now = Instant::now();
        for key in ["a", "b", "c", "d"] {
            put(&mut core, key, now);
        }
        put(&mut core, "e", now);

        // floor(4 * 0.5) = 2 oldest entries go
        assert_eq!(core.keys(), vec!["e", "d", "c"]);
        assert_eq!(core.stats().evictions, 2);
        assert!(core.is_consistent());
    }

    #[test]
    fn test_core_get_protects_from_eviction() {
        let mut core = core(3, 0.34);
        let now = Instant::now();
        put(&mut core, "a", now);
        put(&mut core, "b", now);
        put(&mut core, "c", now);

        core.get("a", now).unwrap();
        put(&mut core, "d", now);

        assert!(core.has_key("a"));
        assert!(!core.has_key("b"));
    }

    #[test]
    fn test_core_lazy_expiry() {
        let mut core = core(10, 0.25);
        let now = Instant::now();
        core.put("a", Some("v".to_string()), MaxAge::secs(1), now)
            .unwrap();

        assert!(core.get("a", now + Duration::from_millis(500)).is_ok());

        let later = now + Duration::from_secs(2);
        assert!(core.has_key("a"));
        assert_eq!(
            core.get("a", later),
            Err(CacheError::NotFound("a".to_string()))
        );
        assert!(!core.has_key("a"));
        assert_eq!(core.stats().expirations, 1);
        assert!(core.is_consistent());
    }

    #[test]
    fn test_core_default_max_age_applies() {
        let config = CacheConfig::default().with_default_max_age(MaxAge::secs(10));
        let mut core: CacheCore<u8> = CacheCore::new(&config);
        let now = Instant::now();
        core.put("a", Some(1), MaxAge::Forever, now).unwrap();

        assert_eq!(
            core.time_to_live("a", now).unwrap(),
            Some(Duration::from_secs(10))
        );
        assert!(core.get("a", now + Duration::from_secs(11)).is_err());
    }

    #[test]
    fn test_core_invalidate() {
        let mut core = core(10, 0.25);
        let now = Instant::now();
        put(&mut core, "a", now);

        assert!(core.invalidate("a").is_ok());
        assert_eq!(
            core.invalidate("a"),
            Err(CacheError::NotFound("a".to_string()))
        );
        assert!(core.is_empty());
    }

    #[test]
    fn test_core_invalidate_all_idempotent() {
        let mut core = core(10, 0.25);
        let now = Instant::now();
        put(&mut core, "a", now);
        put(&mut core, "b", now);

        core.invalidate_all();
        assert_eq!(core.len(), 0);
        core.invalidate_all();
        assert_eq!(core.len(), 0);
        assert!(core.keys().is_empty());
        assert!(core.is_consistent());
    }

    #[test]
    fn test_core_time_to_live() {
        let mut core = core(10, 0.25);
        let now = Instant::now();
        put(&mut core, "forever", now);
        core.put("short", Some("v".to_string()), MaxAge::secs(5), now)
            .unwrap();

        assert_eq!(core.time_to_live("forever", now).unwrap(), None);
        assert_eq!(
            core.time_to_live("short", now + Duration::from_secs(2)).unwrap(),
            Some(Duration::from_secs(3))
        );
        assert!(core.time_to_live("short", now + Duration::from_secs(6)).is_err());
        assert!(core.time_to_live("missing", now).is_err());
    }
}
