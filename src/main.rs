//! Cache soak runner
//!
//! Builds a cache from environment variables, hammers it from concurrent
//! workers and logs statistics until interrupted.
//!
//! # Environment Variables
//! - `CACHE_*` - Cache options, see `CacheConfig::from_env`
//! - `SOAK_WORKERS` - Concurrent worker tasks (default: 4)
//! - `SOAK_KEYSPACE` - Distinct keys the workers touch (default: 1000)
//! - `SOAK_DURATION_SECS` - Stop after this many seconds (default: run until Ctrl+C)

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ttl_lru_cache::{Cache, CacheConfig, CacheError, MaxAge};

/// Worker settings for a soak run.
#[derive(Debug, Clone)]
struct SoakSettings {
    workers: usize,
    keyspace: usize,
    duration: Option<Duration>,
}

impl SoakSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            workers: env_or("SOAK_WORKERS", 4)?,
            keyspace: env_or::<usize>("SOAK_KEYSPACE", 1000)?.max(1),
            duration: match env::var("SOAK_DURATION_SECS") {
                Ok(raw) => Some(Duration::from_secs(
                    raw.parse().context("SOAK_DURATION_SECS must be a number")?,
                )),
                Err(_) => None,
            },
        })
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ttl_lru_cache=info,cache_soak=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cache soak run");

    let config = CacheConfig::from_env().context("Invalid cache configuration")?;
    let settings = SoakSettings::from_env()?;
    info!(
        "Soak settings: workers={}, keyspace={}, duration={:?}",
        settings.workers, settings.keyspace, settings.duration
    );

    let cache: Cache<u64> = Cache::new(config).context("Failed to build cache")?;

    let mut workers = JoinSet::new();
    for id in 0..settings.workers {
        workers.spawn(run_worker(cache.clone(), id, settings.keyspace));
    }
    let reporter = tokio::spawn(report_stats(cache.clone()));

    shutdown_signal(settings.duration).await;

    workers.abort_all();
    reporter.abort();
    warn!("Workers aborted");

    let stats = cache.stats();
    info!(
        "Final stats: {} (hit rate {:.3})",
        serde_json::to_string(&stats)?,
        stats.hit_rate()
    );
    info!("Soak run complete");

    Ok(())
}

/// Issues a fixed put/get/invalidate mix over the key space forever.
async fn run_worker(cache: Cache<u64>, id: usize, keyspace: usize) {
    let mut i: u64 = 0;
    loop {
        let slot = (i as usize)
            .wrapping_mul(7)
            .wrapping_add(id.wrapping_mul(13))
            % keyspace;
        let key = format!("key-{}", slot);

        let outcome = match i % 10 {
            0..=3 => cache.put(&key, i),
            4 => cache.put_with_max_age(&key, i, short_max_age(i)),
            5..=8 => cache.get(&key).map(|_| ()),
            _ => cache.invalidate(&key),
        };

        match outcome {
            Ok(()) | Err(CacheError::NotFound(_)) => {}
            Err(e) => warn!("Worker {}: unexpected error: {}", id, e),
        }

        i = i.wrapping_add(1);
        if i % 256 == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        } else {
            tokio::task::yield_now().await;
        }
    }
}

/// TTL for the short-lived share of puts: 100ms to 900ms, cycling every
/// fifty operations.
fn short_max_age(i: u64) -> MaxAge {
    MaxAge::millis(100 + ((i / 10) % 5) * 200)
}

/// Logs a JSON stats snapshot every second.
async fn report_stats(cache: Cache<u64>) {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.tick().await;
    loop {
        ticker.tick().await;
        match serde_json::to_string(&cache.stats()) {
            Ok(json) => info!("Stats: {}", json),
            Err(e) => warn!("Failed to serialize stats: {}", e),
        }
    }
}

/// Waits for Ctrl+C, SIGTERM or the end of the soak duration.
async fn shutdown_signal(duration: Option<Duration>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let elapsed = async {
        match duration {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
        _ = elapsed => {
            info!("Soak duration elapsed, initiating shutdown...");
        }
    }
}
