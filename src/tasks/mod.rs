//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a cache is alive.
//!
//! # Tasks
//! - TTL Cleanup: Sweeps expired cache entries at the configured interval

mod cleanup;

pub(crate) use cleanup::{spawn_cleanup_task, SweepGuard};
