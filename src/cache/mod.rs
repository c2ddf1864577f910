//! Time-bounded object cache for remote call results.
//!
//! This module is Jira-agnostic:
//! - `ObjectsCache` stores entries keyed by string, with expiry checked on read
//! - `CacheLayer` memoizes successes and failures of any async call
//! - cache keys are built per operation through the `CacheKey` trait
//! - the TTL comes from a "15m"-style setting read on every lookup

pub mod expiry;
mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::ObjectsCache;
pub use traits::{build_key, CacheKey};

#[cfg(test)]
pub use traits::ManualClock;
