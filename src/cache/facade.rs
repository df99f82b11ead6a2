//! Cache Facade
//!
//! Thread-safe public handle. Every operation touching the entry store or the
//! recency list runs under one mutex, shared with the background sweep.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{CacheCore, CacheStats};
use crate::config::{CacheConfig, MaxAge};
use crate::error::{ConfigError, Result};
use crate::tasks::{spawn_cleanup_task, SweepGuard};

// == Shared State ==
/// State shared by every `Cache` clone and the cleanup task.
pub(crate) struct CacheShared<V> {
    core: Mutex<CacheCore<V>>,
    /// Set while an expiry sweep is running
    sweeping: AtomicBool,
    cleanup: OnceLock<JoinHandle<()>>,
}

impl<V: Clone> CacheShared<V> {
    /// Runs one expiry sweep unless another is already in progress.
    ///
    /// Returns None when skipped.
    pub(crate) fn sweep(&self) -> Option<usize> {
        let _guard = SweepGuard::acquire(&self.sweeping)?;
        let mut core = self.core.lock();
        Some(core.sweep_expired(Instant::now()))
    }
}

impl<V> Drop for CacheShared<V> {
    fn drop(&mut self) {
        if let Some(handle) = self.cleanup.get() {
            handle.abort();
            debug!("TTL cleanup task aborted");
        }
    }
}

// == Cache ==
/// In-process LRU cache with per-entry TTL.
///
/// Cloning is cheap and every clone sees the same entries.
///
/// # Example
/// ```
/// use ttl_lru_cache::{Cache, CacheConfig};
///
/// let cache: Cache<String> = Cache::new(CacheConfig::default().with_capacity(2)).unwrap();
/// cache.put("a", "1".to_string()).unwrap();
/// assert_eq!(cache.get("a").unwrap(), "1");
/// ```
pub struct Cache<V> {
    pub(crate) shared: Arc<CacheShared<V>>,
}

impl<V> Clone for Cache<V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<V: Clone + Send + 'static> Cache<V> {
    // == Constructor ==
    /// Builds a cache from a configuration.
    ///
    /// When `cleanup_interval` is set the periodic sweep is registered on the
    /// current tokio runtime; calling this outside a runtime then fails.
    pub fn new(config: CacheConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        let runtime = match config.cleanup_interval {
            Some(_) => Some(
                Handle::try_current().map_err(|e| ConfigError::Scheduler(e.to_string()))?,
            ),
            None => None,
        };

        let shared = Arc::new(CacheShared {
            core: Mutex::new(CacheCore::new(&config)),
            sweeping: AtomicBool::new(false),
            cleanup: OnceLock::new(),
        });

        if let (Some(runtime), Some(interval)) = (runtime, config.cleanup_interval) {
            let handle = spawn_cleanup_task(&runtime, Arc::downgrade(&shared), interval);
            // Freshly created, so the cell is empty
            let _ = shared.cleanup.set(handle);
        }

        info!(
            "Cache initialized: capacity={}, eviction_factor={}, default_max_age={}, cleanup_interval={:?}",
            config.capacity, config.eviction_factor, config.default_max_age, config.cleanup_interval
        );

        Ok(Self { shared })
    }

    // == Put ==
    /// Stores a value under the default max age.
    ///
    /// Passing `None` is rejected with `CacheError::NullValue`.
    pub fn put(&self, key: &str, value: impl Into<Option<V>>) -> Result<()> {
        self.put_with_max_age(key, value, MaxAge::Forever)
    }

    /// Stores a value with its own max age.
    ///
    /// A non-positive or `Forever` max age falls back to the default max age.
    pub fn put_with_max_age(
        &self,
        key: &str,
        value: impl Into<Option<V>>,
        max_age: MaxAge,
    ) -> Result<()> {
        let value = value.into();
        let mut core = self.shared.core.lock();
        core.put(key, value, max_age, Instant::now())
    }

    // == Get ==
    /// Returns the value for `key` and marks it most recently used.
    pub fn get(&self, key: &str) -> Result<V> {
        let mut core = self.shared.core.lock();
        core.get(key, Instant::now())
    }

    // == Invalidate ==
    /// Removes one key.
    pub fn invalidate(&self, key: &str) -> Result<()> {
        self.shared.core.lock().invalidate(key)
    }

    /// Removes every key.
    pub fn invalidate_all(&self) {
        self.shared.core.lock().invalidate_all();
    }

    // == Queries ==
    /// True if the key is stored, even if it has expired but not been swept yet.
    pub fn has_key(&self, key: &str) -> bool {
        self.shared.core.lock().has_key(key)
    }

    /// Stored keys from most to least recently used.
    pub fn keys(&self) -> Vec<String> {
        self.shared.core.lock().keys()
    }

    pub fn size(&self) -> usize {
        self.shared.core.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.core.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.shared.core.lock().capacity()
    }

    /// Remaining lifetime for `key`, `Ok(None)` if it never expires.
    pub fn time_to_live(&self, key: &str) -> Result<Option<Duration>> {
        self.shared.core.lock().time_to_live(key, Instant::now())
    }

    pub fn stats(&self) -> CacheStats {
        self.shared.core.lock().stats()
    }

    // == Purge Expired ==
    /// Runs an expiry sweep now.
    ///
    /// Returns the number of entries removed, or None if a sweep was already
    /// running.
    pub fn purge_expired(&self) -> Option<usize> {
        self.shared.sweep()
    }

    /// True while the background cleanup task is alive.
    pub fn has_cleanup_task(&self) -> bool {
        self.shared
            .cleanup
            .get()
            .is_some_and(|handle| !handle.is_finished())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use std::sync::atomic::Ordering;
    use tokio_test::{assert_err, assert_ok};

    fn cache(capacity: usize, factor: f64) -> Cache<String> {
        Cache::new(
            CacheConfig::default()
                .with_capacity(capacity)
                .with_eviction_factor(factor),
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = Cache::<String>::new(CacheConfig::default().with_capacity(0));
        assert!(matches!(result, Err(ConfigError::InvalidCapacity(0))));
    }

    #[test]
    fn test_new_with_cleanup_needs_runtime() {
        let config = CacheConfig::default().with_cleanup_interval(Duration::from_secs(1));
        let result = Cache::<String>::new(config);
        assert!(matches!(result, Err(ConfigError::Scheduler(_))));
    }

    #[test]
    fn test_put_get_invalidate() {
        let cache = cache(10, 0.25);

        assert_ok!(cache.put("a", "1".to_string()));
        assert_eq!(cache.get("a").unwrap(), "1");
        assert!(cache.has_key("a"));
        assert_ok!(cache.invalidate("a"));
        assert_err!(cache.invalidate("a"));
        assert_eq!(cache.get("a"), Err(CacheError::NotFound("a".to_string())));
    }

    #[test]
    fn test_put_none_is_rejected() {
        let cache = cache(10, 0.25);
        cache.put("a", "1".to_string()).unwrap();

        let result = cache.put("b", None::<String>);
        assert_eq!(result, Err(CacheError::NullValue("b".to_string())));
        assert_eq!(cache.size(), 1);
        assert_eq!(cache.keys(), vec!["a"]);
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = cache(10, 0.25);
        let other = cache.clone();

        other.put("shared", "yes".to_string()).unwrap();
        assert_eq!(cache.get("shared").unwrap(), "yes");
        assert_eq!(cache.capacity(), 10);
    }

    #[test]
    fn test_purge_skipped_while_sweeping() {
        let cache = cache(10, 0.25);
        cache
            .put_with_max_age("a", "1".to_string(), MaxAge::millis(1))
            .unwrap();
        std::thread::sleep(Duration::from_millis(10));

        cache.shared.sweeping.store(true, Ordering::SeqCst);
        assert_eq!(cache.purge_expired(), None);
        assert!(cache.has_key("a"));

        cache.shared.sweeping.store(false, Ordering::SeqCst);
        assert_eq!(cache.purge_expired(), Some(1));
        assert!(!cache.has_key("a"));
        assert!(!cache.shared.sweeping.load(Ordering::SeqCst));
    }

    #[test]
    fn test_no_cleanup_task_without_interval() {
        let cache = cache(10, 0.25);
        assert!(!cache.has_cleanup_task());
    }

    #[tokio::test]
    async fn test_cleanup_task_registered_and_stopped_on_drop() {
        let cache: Cache<String> = Cache::new(
            CacheConfig::default().with_cleanup_interval(Duration::from_millis(50)),
        )
        .unwrap();
        assert!(cache.has_cleanup_task());

        let task = cache
            .shared
            .cleanup
            .get()
            .map(JoinHandle::abort_handle)
            .unwrap();
        let weak = Arc::downgrade(&cache.shared);
        drop(cache);
        assert!(weak.upgrade().is_none());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(task.is_finished(), "Cleanup task should end with the cache");
    }
}
