//! TTL Cleanup Task
//!
//! Background task that periodically sweeps expired cache entries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::cache::CacheShared;

// == Sweep Guard ==
/// Marks an expiry sweep as in progress for as long as it lives.
///
/// Acquiring fails while another guard on the same flag exists. The flag is
/// cleared on drop, whichever way the sweep ends.
pub(crate) struct SweepGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> SweepGuard<'a> {
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Spawns a task that sweeps expired entries every `interval`.
///
/// The first sweep runs one full interval after spawning. Missed ticks are
/// skipped rather than replayed, and a tick that finds a sweep already running
/// does nothing. The task holds only a weak reference and stops once the cache
/// is dropped.
///
/// # Arguments
/// * `runtime` - Runtime to spawn on
/// * `cache` - Weak reference to the shared cache state
/// * `interval` - Time between sweeps
pub(crate) fn spawn_cleanup_task<V>(
    runtime: &Handle,
    cache: Weak<CacheShared<V>>,
    interval: Duration,
) -> JoinHandle<()>
where
    V: Clone + Send + 'static,
{
    runtime.spawn(async move {
        info!("Starting TTL cleanup task with interval of {:?}", interval);

        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let Some(cache) = cache.upgrade() else {
                info!("Cache dropped, stopping TTL cleanup task");
                break;
            };

            match cache.sweep() {
                Some(0) => debug!("TTL cleanup: no expired entries found"),
                Some(removed) => info!("TTL cleanup: removed {} expired entries", removed),
                None => debug!("TTL cleanup: sweep already in progress, skipping tick"),
            }
        }
    })
}
