//! TTL LRU Cache - An in-process key-value cache
//!
//! Capacity-bounded LRU eviction combined with per-entry TTL expiration and
//! an optional background sweep of expired entries.

pub mod cache;
pub mod config;
pub mod error;
mod tasks;

pub use cache::{Cache, CacheStats};
pub use config::{CacheConfig, EvictionPolicy, MaxAge, SweepMode};
pub use error::{CacheError, ConfigError, Result};
