//! Cache Entry Module
//!
//! Defines individual cache entries and their absolute expiry.

use std::time::{Duration, Instant};

use crate::config::MaxAge;

// == Expiry ==
/// Absolute expiry of an entry.
///
/// `Never` is never compared against a clock reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Entry does not expire
    Never,
    /// Entry expires once this instant is in the past
    At(Instant),
}

impl Expiry {
    // == Resolve ==
    /// Computes the expiry for an entry inserted at `now`.
    ///
    /// A positive per-call max age wins; otherwise a positive default applies;
    /// otherwise the entry never expires.
    pub fn resolve(now: Instant, max_age: MaxAge, default_max_age: MaxAge) -> Self {
        match max_age.positive().or_else(|| default_max_age.positive()) {
            // Saturate instead of panicking on absurd durations
            Some(ttl) => now.checked_add(ttl).map_or(Expiry::Never, Expiry::At),
            None => Expiry::Never,
        }
    }

    // == Is Expired ==
    /// Returns true when the expiry is strictly before `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        match self {
            Expiry::At(at) => *at < now,
            Expiry::Never => false,
        }
    }

    /// Time left before expiry, None if the entry never expires.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        match self {
            Expiry::At(at) => Some(at.saturating_duration_since(now)),
            Expiry::Never => None,
        }
    }
}

// == Cache Entry ==
/// A single cached key/value pair. Immutable once built.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    key: String,
    value: V,
    expire_at: Expiry,
}

impl<V> CacheEntry<V> {
    pub fn new(key: String, value: V, expire_at: Expiry) -> Self {
        Self {
            key,
            value,
            expire_at,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn expire_at(&self) -> Expiry {
        self.expire_at
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.expire_at.is_expired(now)
    }
}
