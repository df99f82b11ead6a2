//! Configuration Module
//!
//! Construction-time options for a cache, with defaults, validation and
//! loading from environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

// == Max Age ==
/// Lifetime granted to an entry.
///
/// `Forever` never takes part in time comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaxAge {
    /// Entry never expires
    #[default]
    Forever,
    /// Entry expires this long after insertion
    After(Duration),
}

impl MaxAge {
    /// Shorthand for `MaxAge::After(Duration::from_secs(secs))`.
    pub fn secs(secs: u64) -> Self {
        MaxAge::After(Duration::from_secs(secs))
    }

    /// Shorthand for `MaxAge::After(Duration::from_millis(millis))`.
    pub fn millis(millis: u64) -> Self {
        MaxAge::After(Duration::from_millis(millis))
    }

    /// Returns the duration when this is a strictly positive lifetime.
    pub fn positive(self) -> Option<Duration> {
        match self {
            MaxAge::After(d) if !d.is_zero() => Some(d),
            _ => None,
        }
    }
}

impl From<Duration> for MaxAge {
    fn from(d: Duration) -> Self {
        MaxAge::After(d)
    }
}

impl fmt::Display for MaxAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxAge::Forever => write!(f, "forever"),
            MaxAge::After(d) => write!(f, "{:?}", d),
        }
    }
}

// == Eviction Policy ==
/// Policy used when the cache is full. Only LRU exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Least Recently Used
    #[default]
    Lru,
}

impl FromStr for EvictionPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(EvictionPolicy::Lru),
            other => Err(ConfigError::UnknownEvictionPolicy(other.to_string())),
        }
    }
}

// == Sweep Mode ==
/// How much work one expiry sweep does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SweepMode {
    /// Remove every expired entry in one pass
    #[default]
    Full,
    /// Remove the first expired entry found and stop; later ticks pick up the rest
    FirstExpired,
}

impl FromStr for SweepMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(SweepMode::Full),
            "first-expired" | "first_expired" => Ok(SweepMode::FirstExpired),
            other => Err(ConfigError::UnknownSweepMode(other.to_string())),
        }
    }
}

// == Cache Config ==
/// Cache configuration parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold
    pub capacity: usize,
    /// Fraction of capacity evicted when the cache is full
    pub eviction_factor: f64,
    /// Eviction policy
    pub eviction_policy: EvictionPolicy,
    /// Lifetime for entries put without their own max age
    pub default_max_age: MaxAge,
    /// Background sweep period, None = lazy expiry only
    pub cleanup_interval: Option<Duration>,
    /// Work done per background sweep
    pub sweep_mode: SweepMode,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            eviction_factor: 0.25,
            eviction_policy: EvictionPolicy::Lru,
            default_max_age: MaxAge::Forever,
            cleanup_interval: None,
            sweep_mode: SweepMode::Full,
        }
    }
}

impl CacheConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_eviction_factor(mut self, factor: f64) -> Self {
        self.eviction_factor = factor;
        self
    }

    pub fn with_eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = policy;
        self
    }

    pub fn with_default_max_age(mut self, max_age: MaxAge) -> Self {
        self.default_max_age = max_age;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = Some(interval);
        self
    }

    pub fn with_sweep_mode(mut self, mode: SweepMode) -> Self {
        self.sweep_mode = mode;
        self
    }

    // == Validate ==
    /// Checks every option, returning the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::InvalidCapacity(self.capacity));
        }

        // NaN fails both comparisons
        if !(self.eviction_factor > 0.0 && self.eviction_factor <= 1.0) {
            return Err(ConfigError::InvalidEvictionFactor(self.eviction_factor));
        }

        if let MaxAge::After(d) = self.default_max_age {
            if d.is_zero() {
                return Err(ConfigError::InvalidMaxAge(
                    "default max age must be forever or strictly positive".to_string(),
                ));
            }
        }

        if let Some(interval) = self.cleanup_interval {
            if interval.is_zero() {
                return Err(ConfigError::Scheduler(
                    "cleanup interval must be strictly positive".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Number of entries removed by one capacity eviction.
    ///
    /// Never less than one, so a full cache always makes room.
    pub fn eviction_count(&self) -> usize {
        ((self.capacity as f64 * self.eviction_factor).floor() as usize).max(1)
    }

    // == From Env ==
    /// Loads configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum entries (default: 100)
    /// - `CACHE_EVICTION_FACTOR` - Fraction evicted when full (default: 0.25)
    /// - `CACHE_EVICTION_POLICY` - Only `lru` (default: lru)
    /// - `CACHE_DEFAULT_MAX_AGE_SECS` - Default TTL in seconds, 0 = forever (default: forever)
    /// - `CACHE_CLEANUP_INTERVAL_MS` - Sweep period in milliseconds (default: no sweep)
    /// - `CACHE_SWEEP_MODE` - `full` or `first-expired` (default: full)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(capacity) = parse_var(&lookup, "CACHE_CAPACITY")? {
            config.capacity = capacity;
        }
        if let Some(factor) = parse_var(&lookup, "CACHE_EVICTION_FACTOR")? {
            config.eviction_factor = factor;
        }
        if let Some(raw) = lookup("CACHE_EVICTION_POLICY") {
            config.eviction_policy = raw.parse()?;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "CACHE_DEFAULT_MAX_AGE_SECS")? {
            config.default_max_age = match secs {
                0 => MaxAge::Forever,
                secs => MaxAge::secs(secs),
            };
        }
        if let Some(ms) = parse_var(&lookup, "CACHE_CLEANUP_INTERVAL_MS")? {
            config.cleanup_interval = Some(Duration::from_millis(ms));
        }
        if let Some(raw) = lookup("CACHE_SWEEP_MODE") {
            config.sweep_mode = raw.parse()?;
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&'static str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { name, value }),
    }
}
