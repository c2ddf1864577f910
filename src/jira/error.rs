//! Errors returned by the Jira remote layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Remote call failure.
///
/// Clonable and serializable so that a failure can be memoized in the
/// objects cache and handed back, unchanged, on later hits.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiError {
  /// Network or transport error
  #[error("{account}: {message}")]
  Request { account: String, message: String },

  /// Non-2xx status not covered by a more specific variant
  #[error("{account}: HTTP {status}: {message}")]
  Status {
    account: String,
    status: u16,
    message: String,
  },

  /// 401 / 403
  #[error("{account}: not authorized")]
  Unauthorized { account: String },

  #[error("{account}: not found")]
  NotFound { account: String },

  /// Body doesn't match the expected shape
  #[error("{account}: malformed response: {message}")]
  Decode { account: String, message: String },

  /// Host can't be used to build a client
  #[error("{account}: invalid host: {message}")]
  InvalidHost { account: String, message: String },

  /// No account configured at all
  #[error("No Jira account configured")]
  NoAccounts,

  /// Requested alias doesn't match any account
  #[error("Unknown account: {0}")]
  UnknownAccount(String),
}

impl ApiError {
  pub fn request(account: &str, message: impl std::fmt::Display) -> Self {
    Self::Request {
      account: account.to_string(),
      message: message.to_string(),
    }
  }

  /// Classify a failed HTTP status
  pub fn from_http_status(account: &str, status: u16, message: impl std::fmt::Display) -> Self {
    let account = account.to_string();
    match status {
      401 | 403 => Self::Unauthorized { account },
      404 => Self::NotFound { account },
      _ => Self::Status {
        account,
        status,
        message: message.to_string(),
      },
    }
  }

  pub fn from_gouqi(account: &str, err: gouqi::Error) -> Self {
    match err {
      gouqi::Error::Fault { code, errors } => {
        let message = errors
          .error_messages
          .first()
          .cloned()
          .unwrap_or_else(|| code.to_string());
        Self::from_http_status(account, code.as_u16(), message)
      }
      gouqi::Error::Unauthorized => Self::Unauthorized {
        account: account.to_string(),
      },
      gouqi::Error::NotFound => Self::NotFound {
        account: account.to_string(),
      },
      gouqi::Error::Serde(e) => Self::Decode {
        account: account.to_string(),
        message: e.to_string(),
      },
      other => Self::request(account, other),
    }
  }
}
