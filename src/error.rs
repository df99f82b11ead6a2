//! Error types for the cache
//!
//! Configuration problems are fatal and stop a cache from being built.
//! Operation errors are ordinary results the caller branches on.

use thiserror::Error;

// == Config Error Enum ==
/// Fatal errors raised while building a cache.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Capacity must hold at least one entry
    #[error("Invalid capacity: {0} (must be greater than zero)")]
    InvalidCapacity(usize),

    /// Eviction factor outside (0.0, 1.0]
    #[error("Invalid eviction factor: {0} (must be in (0.0, 1.0])")]
    InvalidEvictionFactor(f64),

    /// Default max age that is neither forever nor positive
    #[error("Invalid default max age: {0}")]
    InvalidMaxAge(String),

    /// Eviction policy name that is not supported
    #[error("Unknown eviction policy: {0}")]
    UnknownEvictionPolicy(String),

    /// Sweep mode name that is not supported
    #[error("Unknown sweep mode: {0}")]
    UnknownSweepMode(String),

    /// Environment variable present but not parsable
    #[error("Invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },

    /// The periodic cleanup task could not be registered
    #[error("Failed to register cleanup task: {0}")]
    Scheduler(String),
}

// == Cache Error Enum ==
/// Reportable failures of individual cache operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key not found in cache (absent or expired)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Attempted to store an absent value
    #[error("Null value rejected for key: {0}")]
    NullValue(String),
}

impl CacheError {
    /// Returns true for the "not found" outcome of `get`/`invalidate`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound(_))
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
