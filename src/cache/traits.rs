//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::warn;

/// A memoized outcome of a remote call.
///
/// `data` holds either the successful result or the error value, told apart
/// by `is_error`. Use [`CacheEntry::outcome`] to get a typed view that never
/// hands an error to success-path code.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
  pub key: String,
  /// When the entry was written
  pub timestamp: DateTime<Utc>,
  pub data: Value,
  pub is_error: bool,
}

impl CacheEntry {
  /// Decode the stored payload into `Ok(T)` or `Err(E)` depending on the
  /// error flag.
  ///
  /// Returns `None` if the payload no longer matches the requested shape.
  pub fn outcome<T, E>(&self) -> Option<Result<T, E>>
  where
    T: DeserializeOwned,
    E: DeserializeOwned,
  {
    let decoded = if self.is_error {
      serde_json::from_value::<E>(self.data.clone()).map(Err)
    } else {
      serde_json::from_value::<T>(self.data.clone()).map(Ok)
    };

    match decoded {
      Ok(outcome) => Some(outcome),
      Err(e) => {
        warn!(key = %self.key, error = %e, "Cached payload has unexpected shape");
        None
      }
    }
  }
}

/// Trait for cache keys of remote operations.
///
/// Each operation declares its own key template instead of deriving one from
/// the function it wraps.
pub trait CacheKey {
  /// Logical name of the operation (e.g. "getIssue")
  fn operation(&self) -> &'static str;

  /// Full, deterministic cache key.
  fn cache_key(&self) -> String;
}

/// Build a key of the form `<namespace>-<operation>-<json args>`.
///
/// Arguments are serialized through `serde_json::Value`, whose maps are
/// sorted, so two equal argument sets always give the same string.
pub fn build_key<A: Serialize + std::fmt::Debug>(namespace: &str, operation: &str, args: &A) -> String {
  match serde_json::to_value(args) {
    Ok(value) => format!("{}-{}-{}", namespace, operation, value),
    Err(e) => {
      warn!(operation, error = %e, "Failed to serialize cache key arguments");
      format!("{}-{}-{:?}", namespace, operation, args)
    }
  }
}

/// Source of the current time, injectable for tests.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// Manually advanced clock for tests.
#[cfg(test)]
#[derive(Debug)]
pub struct ManualClock {
  now: std::sync::Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
  pub fn new() -> Self {
    Self {
      now: std::sync::Mutex::new(Utc::now()),
    }
  }

  pub fn advance(&self, by: chrono::Duration) {
    let mut now = self.now.lock().unwrap();
    *now += by;
  }
}

#[cfg(test)]
impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    *self.now.lock().unwrap()
  }
}
