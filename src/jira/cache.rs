//! Cache keys for Jira API calls.

use crate::cache::{build_key, CacheKey};

use super::options::{AccountOptions, BoardOptions, IssueOptions, SearchOptions, SprintOptions};

/// Namespace of every key built for the remote API.
const API_NAMESPACE: &str = "api";

/// Query key types for Jira API calls.
///
/// Each variant carries exactly the arguments of one remote operation. The
/// key is `api-<operation>-[<primary>,<options>]`.
#[derive(Clone, Debug)]
pub enum JiraQueryKey<'a> {
  /// Get a single issue by key
  Issue { key: &'a str, options: &'a IssueOptions },
  /// Search issues with JQL
  Search { query: &'a str, options: &'a SearchOptions },
  /// Development status of an issue (by numeric id)
  DevStatus { issue_id: &'a str, options: &'a AccountOptions },
  /// List boards of a project
  Boards { project: &'a str, options: &'a BoardOptions },
  /// Get a single sprint
  Sprint { sprint_id: u64, options: &'a AccountOptions },
  /// List sprints of a board
  Sprints { board_id: u64, options: &'a SprintOptions },
  /// User the account is authenticated as
  LoggedUser { options: &'a AccountOptions },
}

impl CacheKey for JiraQueryKey<'_> {
  fn operation(&self) -> &'static str {
    match self {
      Self::Issue { .. } => "getIssue",
      Self::Search { .. } => "getSearchResults",
      Self::DevStatus { .. } => "getDevStatus",
      Self::Boards { .. } => "getBoards",
      Self::Sprint { .. } => "getSprint",
      Self::Sprints { .. } => "getSprints",
      Self::LoggedUser { .. } => "getLoggedUser",
    }
  }

  fn cache_key(&self) -> String {
    let operation = self.operation();
    match self {
      Self::Issue { key, options } => build_key(API_NAMESPACE, operation, &(key, options)),
      Self::Search { query, options } => build_key(API_NAMESPACE, operation, &(query, options)),
      Self::DevStatus { issue_id, options } => {
        build_key(API_NAMESPACE, operation, &(issue_id, options))
      }
      Self::Boards { project, options } => build_key(API_NAMESPACE, operation, &(project, options)),
      Self::Sprint { sprint_id, options } => {
        build_key(API_NAMESPACE, operation, &(sprint_id, options))
      }
      Self::Sprints { board_id, options } => {
        build_key(API_NAMESPACE, operation, &(board_id, options))
      }
      Self::LoggedUser { options } => build_key(API_NAMESPACE, operation, &(options,)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::{Account, AuthType};
  use crate::jira::types::SprintState;

  fn account(alias: &str) -> Account {
    Account {
      alias: alias.to_string(),
      host: format!("https://{}.atlassian.net", alias),
      auth_type: AuthType::Basic,
      username: Some("me@example.com".to_string()),
      password: "secret-token".to_string(),
      priority: 1,
      color: None,
    }
  }

  fn issue_key(key: &str, options: &IssueOptions) -> String {
    JiraQueryKey::Issue { key, options }.cache_key()
  }

  #[test]
  fn test_key_format() {
    let options = BoardOptions {
      limit: Some(1),
      ..Default::default()
    };
    let key = JiraQueryKey::Boards {
      project: "PROJ",
      options: &options,
    }
    .cache_key();
    assert_eq!(key, r#"api-getBoards-["PROJ",{"limit":1}]"#);

    let options = SprintOptions {
      limit: Some(1),
      state: Some(vec![SprintState::Active]),
      ..Default::default()
    };
    let key = JiraQueryKey::Sprints {
      board_id: 1234,
      options: &options,
    }
    .cache_key();
    assert_eq!(key, r#"api-getSprints-[1234,{"limit":1,"state":["active"]}]"#);
  }

  #[test]
  fn test_same_arguments_same_key() {
    let a = IssueOptions {
      fields: Some(vec!["summary".to_string()]),
      account: Some(account("work")),
    };
    let b = a.clone();
    assert_eq!(issue_key("AAA-1", &a), issue_key("AAA-1", &b));
  }

  #[test]
  fn test_every_argument_changes_key() {
    let base = IssueOptions::default();
    let with_fields = IssueOptions {
      fields: Some(vec!["summary".to_string()]),
      ..Default::default()
    };
    let with_work = IssueOptions {
      account: Some(account("work")),
      ..Default::default()
    };
    let with_home = IssueOptions {
      account: Some(account("home")),
      ..Default::default()
    };

    let keys = [
      issue_key("AAA-1", &base),
      issue_key("AAA-2", &base),
      issue_key("AAA-1", &with_fields),
      issue_key("AAA-1", &with_work),
      issue_key("AAA-1", &with_home),
    ];
    for (i, a) in keys.iter().enumerate() {
      for b in &keys[i + 1..] {
        assert_ne!(a, b);
      }
    }
  }

  #[test]
  fn test_operations_do_not_collide() {
    let search = SearchOptions::default();
    let dev = AccountOptions::default();
    let issue = IssueOptions::default();

    let a = JiraQueryKey::Search {
      query: "AAA-1",
      options: &search,
    }
    .cache_key();
    let b = JiraQueryKey::DevStatus {
      issue_id: "AAA-1",
      options: &dev,
    }
    .cache_key();
    let c = issue_key("AAA-1", &issue);
    assert_ne!(a, b);
    assert_ne!(b, c);
    assert_ne!(a, c);
  }

  #[test]
  fn test_pagination_changes_key() {
    let first = SearchOptions {
      limit: Some(10),
      ..Default::default()
    };
    let second = SearchOptions {
      limit: Some(10),
      offset: Some(10),
      ..Default::default()
    };
    let a = JiraQueryKey::Search {
      query: "project = A",
      options: &first,
    }
    .cache_key();
    let b = JiraQueryKey::Search {
      query: "project = A",
      options: &second,
    }
    .cache_key();
    assert_ne!(a, b);
  }

  #[test]
  fn test_key_never_contains_credentials() {
    let options = AccountOptions {
      account: Some(account("work")),
    };
    let key = JiraQueryKey::LoggedUser { options: &options }.cache_key();
    assert!(!key.contains("secret-token"));
    assert!(key.contains(&account("work").fingerprint()));
  }
}
