//! In-memory object cache with freshness-aware reads.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use chrono::Duration;
use tracing::{debug, warn};

use super::expiry::{default_ttl, parse_cache_time, ExpirySource, DEFAULT_CACHE_TIME};
use super::traits::{CacheEntry, Clock, SystemClock};

/// Process-wide key -> entry store.
///
/// Staleness is checked lazily in [`ObjectsCache::get`] against the TTL
/// read from the expiry source at that moment. Stale entries stay in the
/// map until the next [`ObjectsCache::add`] for the same key overwrites
/// them, or until [`ObjectsCache::clear`].
pub struct ObjectsCache {
  entries: Mutex<HashMap<String, CacheEntry>>,
  expiry: Arc<dyn ExpirySource>,
  clock: Arc<dyn Clock>,
  /// Last invalid cache time reported, so a bad setting is logged once
  warned: Mutex<Option<String>>,
}

impl ObjectsCache {
  /// Create an empty cache using the wall clock.
  pub fn new(expiry: Arc<dyn ExpirySource>) -> Self {
    Self::with_clock(expiry, Arc::new(SystemClock))
  }

  /// Create an empty cache with a custom clock.
  pub fn with_clock(expiry: Arc<dyn ExpirySource>, clock: Arc<dyn Clock>) -> Self {
    Self {
      entries: Mutex::new(HashMap::new()),
      expiry,
      clock,
      warned: Mutex::new(None),
    }
  }

  // Every mutation replaces a whole entry or the whole map, so a panic
  // while holding the lock can't leave a half-written entry behind.
  fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Get the entry for `key` if it is present and still fresh.
  pub fn get(&self, key: &str) -> Option<CacheEntry> {
    let ttl = self.ttl();
    let now = self.clock.now();

    let entries = self.entries();
    let entry = entries.get(key)?;
    if now - entry.timestamp < ttl {
      debug!(key, is_error = entry.is_error, "Cache hit");
      Some(entry.clone())
    } else {
      debug!(key, "Cache entry expired");
      None
    }
  }

  /// Current TTL, falling back to the default for an invalid cache time.
  fn ttl(&self) -> Duration {
    let cache_time = self.expiry.cache_time();
    let ttl = parse_cache_time(&cache_time);
    if self.needs_warning(&cache_time, ttl.is_none()) {
      warn!(
        cache_time = cache_time.as_str(),
        fallback = DEFAULT_CACHE_TIME,
        "Invalid cache time, using default"
      );
    }
    ttl.unwrap_or_else(default_ttl)
  }

  /// Whether an invalid `cache_time` hasn't been reported yet. A valid
  /// value resets the memory so a later bad value is reported again.
  fn needs_warning(&self, cache_time: &str, invalid: bool) -> bool {
    let mut warned = self.warned.lock().unwrap_or_else(PoisonError::into_inner);
    if !invalid {
      *warned = None;
      return false;
    }
    if warned.as_deref() == Some(cache_time) {
      return false;
    }
    *warned = Some(cache_time.to_string());
    true
  }

  /// Store `data` under `key`, replacing any previous entry.
  pub fn add(&self, key: &str, data: Value, is_error: bool) -> CacheEntry {
    let entry = CacheEntry {
      key: key.to_string(),
      timestamp: self.clock.now(),
      data,
      is_error,
    };
    self.entries().insert(key.to_string(), entry.clone());
    debug!(key, is_error, "Cache write");
    entry
  }

  /// Remove every entry.
  pub fn clear(&self) {
    let mut entries = self.entries();
    let count = entries.len();
    entries.clear();
    debug!(count, "Cache cleared");
  }

  /// Number of stored entries, fresh or stale.
  pub fn len(&self) -> usize {
    self.entries().len()
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl std::fmt::Debug for ObjectsCache {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ObjectsCache")
      .field("entries", &self.len())
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::expiry::FixedExpiry;
  use crate::cache::traits::ManualClock;
  use chrono::Duration;
  use serde_json::json;
  use std::sync::RwLock;

  fn cache(cache_time: &str) -> (ObjectsCache, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let cache = ObjectsCache::with_clock(
      Arc::new(FixedExpiry(cache_time.to_string())),
      clock.clone(),
    );
    (cache, clock)
  }

  #[test]
  fn test_get_after_add() {
    let (cache, _) = cache("15m");
    let stored = cache.add("k", json!({"a": 1}), false);

    let entry = cache.get("k").unwrap();
    assert_eq!(entry, stored);
    assert_eq!(entry.data, json!({"a": 1}));
    assert!(!entry.is_error);
  }

  #[test]
  fn test_missing_key() {
    let (cache, _) = cache("15m");
    assert!(cache.get("nope").is_none());
  }

  #[test]
  fn test_entry_expires_after_ttl() {
    let (cache, clock) = cache("15m");
    cache.add("k", json!(1), false);

    clock.advance(Duration::minutes(14) + Duration::seconds(59));
    assert!(cache.get("k").is_some());

    clock.advance(Duration::seconds(1));
    assert!(cache.get("k").is_none());
  }

  #[test]
  fn test_stale_entry_is_kept_until_overwritten() {
    let (cache, clock) = cache("1m");
    cache.add("k", json!(1), false);
    clock.advance(Duration::minutes(2));

    assert!(cache.get("k").is_none());
    assert_eq!(cache.len(), 1);

    cache.add("k", json!(2), false);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get("k").unwrap().data, json!(2));
  }

  #[test]
  fn test_error_entry_keeps_flag() {
    let (cache, clock) = cache("15m");
    cache.add("k", json!("HTTP status 500"), true);

    let entry = cache.get("k").unwrap();
    assert!(entry.is_error);
    assert_eq!(entry.data, json!("HTTP status 500"));

    // Same TTL as success entries
    clock.advance(Duration::minutes(15));
    assert!(cache.get("k").is_none());
  }

  #[test]
  fn test_repeated_reads_are_equal() {
    let (cache, clock) = cache("15m");
    cache.add("k", json!([1, 2, 3]), false);

    let first = cache.get("k").unwrap();
    clock.advance(Duration::minutes(1));
    let second = cache.get("k").unwrap();

    assert_eq!(first, second);
    assert_eq!(cache.len(), 1);
  }

  #[test]
  fn test_add_overwrites() {
    let (cache, clock) = cache("15m");
    cache.add("k", json!("old"), true);
    clock.advance(Duration::minutes(1));
    let stored = cache.add("k", json!("new"), false);

    let entry = cache.get("k").unwrap();
    assert_eq!(entry, stored);
    assert!(!entry.is_error);
  }

  #[test]
  fn test_clear_wipes_all() {
    let (cache, _) = cache("15m");
    for i in 0..5 {
      cache.add(&format!("k{}", i), json!(i), i % 2 == 0);
    }

    cache.clear();

    for i in 0..5 {
      assert!(cache.get(&format!("k{}", i)).is_none());
    }
    assert!(cache.is_empty());
  }

  #[test]
  fn test_zero_ttl_never_fresh() {
    let (cache, _) = cache("0s");
    cache.add("k", json!(1), false);
    assert!(cache.get("k").is_none());
  }

  #[test]
  fn test_invalid_cache_time_uses_default() {
    let (cache, clock) = cache("soon");
    cache.add("k", json!(1), false);

    clock.advance(Duration::minutes(14));
    assert!(cache.get("k").is_some());
    clock.advance(Duration::minutes(1));
    assert!(cache.get("k").is_none());
  }

  #[test]
  fn test_invalid_cache_time_reported_once() {
    let expiry = Arc::new(MutableExpiry(RwLock::new("soon".to_string())));
    let cache = ObjectsCache::new(expiry.clone());

    cache.get("a");
    assert_eq!(cache.warned.lock().unwrap().as_deref(), Some("soon"));
    // Further lookups with the same bad value stay quiet
    assert!(!cache.needs_warning("soon", true));
    cache.get("b");
    assert!(!cache.needs_warning("soon", true));

    // A different bad value is reported
    *expiry.0.write().unwrap() = "later".to_string();
    cache.get("c");
    assert_eq!(cache.warned.lock().unwrap().as_deref(), Some("later"));

    // Fixing the value resets, so the old bad value would be reported again
    *expiry.0.write().unwrap() = "5m".to_string();
    cache.get("d");
    assert!(cache.warned.lock().unwrap().is_none());
    assert!(cache.needs_warning("soon", true));
  }

  struct MutableExpiry(RwLock<String>);

  impl ExpirySource for MutableExpiry {
    fn cache_time(&self) -> String {
      self.0.read().unwrap().clone()
    }
  }

  #[test]
  fn test_ttl_change_applies_to_existing_entries() {
    let expiry = Arc::new(MutableExpiry(RwLock::new("1h".to_string())));
    let clock = Arc::new(ManualClock::new());
    let cache = ObjectsCache::with_clock(expiry.clone(), clock.clone());

    cache.add("k", json!(1), false);
    clock.advance(Duration::minutes(10));
    assert!(cache.get("k").is_some());

    // Shrinking the TTL makes the old entry stale without rewriting it
    *expiry.0.write().unwrap() = "5m".to_string();
    assert!(cache.get("k").is_none());

    *expiry.0.write().unwrap() = "1h".to_string();
    assert!(cache.get("k").is_some());
  }
}
