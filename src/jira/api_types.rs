//! Serde-deserializable envelopes of Jira API responses.
//!
//! Payload types live in `types`; these only unwrap the paging structure of
//! the agile endpoints.

use serde::Deserialize;

/// Page of an agile API listing (`/board`, `/board/{id}/sprint`)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPage<T> {
  #[serde(default = "Vec::new")]
  pub values: Vec<T>,
}

/// Build a query string, skipping absent parameters.
pub fn query_string<'a>(params: impl IntoIterator<Item = (&'a str, Option<String>)>) -> String {
  let mut serializer = url::form_urlencoded::Serializer::new(String::new());
  for (name, value) in params {
    if let Some(value) = value {
      serializer.append_pair(name, &value);
    }
  }
  let query = serializer.finish();
  if query.is_empty() {
    query
  } else {
    format!("?{}", query)
  }
}

/// Percent-encode a single path segment (issue keys, ids).
pub fn path_segment(segment: &str) -> String {
  url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}
