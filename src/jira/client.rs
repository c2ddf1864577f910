use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::{Account, AuthType, SettingsHandle};
use crate::jira::api_types::{path_segment, query_string, ApiPage};
use crate::jira::error::ApiError;
use crate::jira::options::{AccountOptions, BoardOptions, IssueOptions, SearchOptions, SprintOptions};
use crate::jira::types::{Board, DevStatus, Issue, SearchResults, Sprint, User};

/// Remote operations of the Jira REST API.
///
/// One async function per logical operation, each taking a primary argument
/// plus its options.
#[async_trait]
pub trait JiraApi: Send + Sync {
  async fn get_issue(&self, key: &str, options: &IssueOptions) -> Result<Issue, ApiError>;

  async fn get_search_results(
    &self,
    query: &str,
    options: &SearchOptions,
  ) -> Result<SearchResults, ApiError>;

  async fn get_dev_status(&self, issue_id: &str, options: &AccountOptions) -> Result<DevStatus, ApiError>;

  async fn get_boards(&self, project: &str, options: &BoardOptions) -> Result<Vec<Board>, ApiError>;

  async fn get_sprint(&self, sprint_id: u64, options: &AccountOptions) -> Result<Sprint, ApiError>;

  async fn get_sprints(&self, board_id: u64, options: &SprintOptions) -> Result<Vec<Sprint>, ApiError>;

  async fn get_logged_user(&self, options: &AccountOptions) -> Result<User, ApiError>;
}

/// Jira API client wrapper
///
/// Requests without an explicit account go to the configured accounts in
/// priority order; the first one that answers wins.
#[derive(Clone)]
pub struct JiraClient {
  settings: SettingsHandle,
}

impl JiraClient {
  pub fn new(settings: SettingsHandle) -> Self {
    Self { settings }
  }

  fn connect(account: &Account) -> Result<gouqi::r#async::Jira, ApiError> {
    let credentials = match account.auth_type {
      AuthType::Open => gouqi::Credentials::Anonymous,
      AuthType::Basic | AuthType::Cloud => gouqi::Credentials::Basic(
        account.username.clone().unwrap_or_default(),
        account.password.clone(),
      ),
      AuthType::Bearer => gouqi::Credentials::Bearer(account.password.clone()),
    };

    gouqi::r#async::Jira::new(&account.host, credentials).map_err(|e| ApiError::InvalidHost {
      account: account.alias.clone(),
      message: e.to_string(),
    })
  }

  /// GET `endpoint` of `api_name` ("api", "agile", "dev-status").
  ///
  /// Returns the decoded body and the alias of the account that served it.
  async fn get<D: DeserializeOwned>(
    &self,
    account: Option<&Account>,
    api_name: &str,
    endpoint: &str,
  ) -> Result<(D, String), ApiError> {
    let accounts = match account {
      Some(account) => vec![account.clone()],
      None => self.settings.get().accounts,
    };

    let mut last_error = ApiError::NoAccounts;
    for account in accounts {
      debug!(account = %account.alias, api_name, endpoint, "Jira request");
      let result: Result<D, ApiError> = match Self::connect(&account) {
        Ok(client) => client
          .get(api_name, endpoint)
          .await
          .map_err(|e| ApiError::from_gouqi(&account.alias, e)),
        Err(e) => Err(e),
      };

      match result {
        Ok(body) => return Ok((body, account.alias)),
        Err(e) => {
          warn!(account = %account.alias, error = %e, "Jira request failed");
          last_error = e;
        }
      }
    }

    Err(last_error)
  }
}

fn join(values: &Option<Vec<String>>) -> Option<String> {
  values.as_ref().map(|v| v.join(","))
}

#[async_trait]
impl JiraApi for JiraClient {
  /// Get a single issue by key
  async fn get_issue(&self, key: &str, options: &IssueOptions) -> Result<Issue, ApiError> {
    let endpoint = format!(
      "/issue/{}{}",
      path_segment(key),
      query_string([("fields", join(&options.fields))])
    );

    let (mut issue, alias): (Issue, _) = self.get(options.account.as_ref(), "api", &endpoint).await?;
    issue.account = Some(alias);
    Ok(issue)
  }

  /// Search for issues using JQL
  async fn get_search_results(
    &self,
    query: &str,
    options: &SearchOptions,
  ) -> Result<SearchResults, ApiError> {
    let endpoint = format!(
      "/search{}",
      query_string([
        ("jql", Some(query.to_string())),
        ("startAt", options.offset.map(|o| o.to_string())),
        ("maxResults", options.limit.map(|l| l.to_string())),
        ("fields", join(&options.fields)),
      ])
    );

    let (mut results, alias): (SearchResults, _) =
      self.get(options.account.as_ref(), "api", &endpoint).await?;
    for issue in &mut results.issues {
      issue.account = Some(alias.clone());
    }
    results.account = Some(alias);
    Ok(results)
  }

  /// Pull request / build summary for an issue id
  async fn get_dev_status(&self, issue_id: &str, options: &AccountOptions) -> Result<DevStatus, ApiError> {
    let endpoint = format!(
      "/issue/summary{}",
      query_string([("issueId", Some(issue_id.to_string()))])
    );

    let (status, _) = self.get(options.account.as_ref(), "dev-status", &endpoint).await?;
    Ok(status)
  }

  /// Get boards of a project
  async fn get_boards(&self, project: &str, options: &BoardOptions) -> Result<Vec<Board>, ApiError> {
    let endpoint = format!(
      "/board{}",
      query_string([
        ("projectKeyOrId", Some(project.to_string())),
        ("startAt", options.offset.map(|o| o.to_string())),
        ("maxResults", options.limit.map(|l| l.to_string())),
      ])
    );

    let (page, _): (ApiPage<Board>, _) = self.get(options.account.as_ref(), "agile", &endpoint).await?;
    Ok(page.values)
  }

  async fn get_sprint(&self, sprint_id: u64, options: &AccountOptions) -> Result<Sprint, ApiError> {
    let endpoint = format!("/sprint/{}", sprint_id);

    let (sprint, _) = self.get(options.account.as_ref(), "agile", &endpoint).await?;
    Ok(sprint)
  }

  /// Get sprints of a board, optionally filtered by state
  async fn get_sprints(&self, board_id: u64, options: &SprintOptions) -> Result<Vec<Sprint>, ApiError> {
    let state = options.state.as_ref().map(|states| {
      states
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(",")
    });
    let endpoint = format!(
      "/board/{}/sprint{}",
      board_id,
      query_string([
        ("state", state),
        ("startAt", options.offset.map(|o| o.to_string())),
        ("maxResults", options.limit.map(|l| l.to_string())),
      ])
    );

    let (page, _): (ApiPage<Sprint>, _) = self.get(options.account.as_ref(), "agile", &endpoint).await?;
    Ok(page.values)
  }

  async fn get_logged_user(&self, options: &AccountOptions) -> Result<User, ApiError> {
    let (user, _) = self.get(options.account.as_ref(), "api", "/myself").await?;
    Ok(user)
  }
}
