//! Cache Module
//!
//! In-memory caching with TTL expiration and LRU eviction.

mod core;
mod entry;
mod eviction;
mod facade;
mod recency;
mod stats;
mod store;


// Re-export public types
pub use self::core::CacheCore;
pub use entry::{CacheEntry, Expiry};
pub use facade::Cache;
pub use recency::{NodeId, RecencyList};
pub use stats::CacheStats;
pub use store::EntryStore;

pub(crate) use facade::CacheShared;
