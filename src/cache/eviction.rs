//! Eviction Engine
//!
//! Stateless removal procedures run against a locked `CacheCore`: capacity
//! eviction from the LRU tail and the TTL expiry sweep. Neither reports errors;
//! keys that have already disappeared are skipped.

use std::time::Instant;

use tracing::trace;

use crate::cache::CacheCore;
use crate::config::SweepMode;

// == Capacity Eviction ==
/// Removes up to `count` least recently used entries.
///
/// Stops early if the cache empties first. Returns how many were removed.
pub fn evict_lru<V: Clone>(core: &mut CacheCore<V>, count: usize) -> usize {
    let mut removed = 0;
    while removed < count {
        match core.pop_lru() {
            Some(entry) => {
                trace!("Evicted {}", entry.key());
                removed += 1;
            }
            None => break,
        }
    }
    removed
}

// == Expiry Sweep ==
/// Removes entries whose expiry is strictly before `now`.
///
/// `SweepMode::FirstExpired` stops after the first removal and leaves the rest
/// to later sweeps; `SweepMode::Full` clears every expired entry in one pass.
pub fn sweep_expired<V: Clone>(core: &mut CacheCore<V>, now: Instant, mode: SweepMode) -> usize {
    let limit = match mode {
        SweepMode::Full => usize::MAX,
        SweepMode::FirstExpired => 1,
    };

    core.expired_keys(now, limit)
        .into_iter()
        .filter(|key| core.unlink(key).is_some())
        .count()
}
