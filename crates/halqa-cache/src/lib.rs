//! # halqa-cache
//!
//! Cache of derived per-participant attendance state. The join/leave
//! recorder and the reconciler invalidate a participant's entry whenever
//! its underlying attendance changes.
//!
//! `cache.provider` picks the backend: `memory` (moka, one process) or
//! `redis` (shared across workers).

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::CacheManager;
