//! Cache expiry policy: turns the `cache_time` setting into a TTL.

use chrono::Duration;

/// TTL used when the configured value can't be parsed.
pub const DEFAULT_CACHE_TIME: &str = "15m";

/// Provides the current cache time setting.
///
/// Read on every cache lookup so that settings changes apply immediately.
pub trait ExpirySource: Send + Sync {
  fn cache_time(&self) -> String;
}

/// A cache time that never changes.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct FixedExpiry(pub String);

#[cfg(test)]
impl ExpirySource for FixedExpiry {
  fn cache_time(&self) -> String {
    self.0.clone()
  }
}

/// Default TTL (15 minutes).
pub fn default_ttl() -> Duration {
  Duration::minutes(15)
}

/// Parse a duration like "5s", "15m" or "24h".
///
/// Returns `None` for anything else: missing number, unknown unit,
/// negative or fractional values, or a value too large to represent.
pub fn parse_cache_time(value: &str) -> Option<Duration> {
  let value = value.trim();
  let unit = value.chars().last()?;
  let number = value[..value.len() - unit.len_utf8()].trim_end();

  if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
    return None;
  }
  let number: i64 = number.parse().ok()?;

  match unit {
    's' => Duration::try_seconds(number),
    'm' => Duration::try_minutes(number),
    'h' => Duration::try_hours(number),
    _ => None,
  }
}
