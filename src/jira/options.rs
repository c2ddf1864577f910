//! Per-call options of the Jira remote operations.
//!
//! Options are part of the cache key, so they serialize only what changes
//! the result: absent fields are skipped and the account is reduced to its
//! fingerprint.

use serde::{Serialize, Serializer};

use super::types::SprintState;
use crate::config::Account;

fn account_fingerprint<S: Serializer>(account: &Option<Account>, serializer: S) -> Result<S::Ok, S::Error> {
  match account {
    Some(account) => serializer.serialize_str(&account.fingerprint()),
    None => serializer.serialize_none(),
  }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AccountOptions {
  #[serde(skip_serializing_if = "Option::is_none", serialize_with = "account_fingerprint")]
  pub account: Option<Account>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IssueOptions {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub fields: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none", serialize_with = "account_fingerprint")]
  pub account: Option<Account>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchOptions {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub limit: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub offset: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub fields: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none", serialize_with = "account_fingerprint")]
  pub account: Option<Account>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BoardOptions {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub limit: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub offset: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none", serialize_with = "account_fingerprint")]
  pub account: Option<Account>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SprintOptions {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub limit: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub offset: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub state: Option<Vec<SprintState>>,
  #[serde(skip_serializing_if = "Option::is_none", serialize_with = "account_fingerprint")]
  pub account: Option<Account>,
}
