//! Cache layer that memoizes remote calls in the objects cache.

use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use super::storage::ObjectsCache;
use super::traits::CacheKey;

/// Wraps remote calls so that repeated calls with the same key return the
/// memoized outcome while it is fresh.
///
/// Both successes and failures are memoized. A failing call is not retried
/// until its entry expires, and the memoized failure is surfaced as `Err`
/// again on every hit.
#[derive(Clone)]
pub struct CacheLayer {
  cache: Arc<ObjectsCache>,
}

impl CacheLayer {
  pub fn new(cache: Arc<ObjectsCache>) -> Self {
    Self { cache }
  }

  /// The underlying cache.
  pub fn cache(&self) -> &Arc<ObjectsCache> {
    &self.cache
  }

  /// Fetch with cache-first strategy.
  ///
  /// 1. Fresh entry for the key: return it (`Err` for error entries)
  /// 2. Otherwise call the fetcher
  /// 3. Store the outcome, success or error, and return it unchanged
  pub async fn fetch<K, T, E, F, Fut>(&self, key: &K, fetcher: F) -> Result<T, E>
  where
    K: CacheKey + ?Sized,
    T: Serialize + DeserializeOwned,
    E: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    let cache_key = key.cache_key();

    if let Some(outcome) = self
      .cache
      .get(&cache_key)
      .and_then(|entry| entry.outcome::<T, E>())
    {
      return outcome;
    }

    debug!(key = %cache_key, operation = key.operation(), "Cache miss, calling remote");
    let outcome = fetcher().await;

    let stored = match &outcome {
      Ok(data) => serde_json::to_value(data).map(|value| (value, false)),
      Err(error) => serde_json::to_value(error).map(|value| (value, true)),
    };
    match stored {
      Ok((value, is_error)) => {
        if is_error {
          debug!(key = %cache_key, "Memoizing remote failure");
        }
        self.cache.add(&cache_key, value, is_error);
      }
      Err(e) => warn!(key = %cache_key, error = %e, "Result not cacheable"),
    }

    outcome
  }
}
