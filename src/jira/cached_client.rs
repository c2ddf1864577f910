//! Cached Jira client that wraps a `JiraApi` with transparent caching.

use std::sync::Arc;

use crate::cache::{CacheKey, CacheLayer, ObjectsCache};
use crate::config::Account;

use super::cache::JiraQueryKey;
use super::client::{JiraApi, JiraClient};
use super::error::ApiError;
use super::options::{AccountOptions, BoardOptions, IssueOptions, SearchOptions, SprintOptions};
use super::types::{Board, DevStatus, Issue, SearchResults, Sprint, SprintState, User};

/// Jira client with transparent caching support.
///
/// Same operations as the wrapped client; every call goes through the
/// cache layer, so a repeated call within the cache time returns the
/// memoized result or the memoized error.
pub struct CachedJiraClient<A: JiraApi = JiraClient> {
  inner: Arc<A>,
  cache: CacheLayer,
}

impl<A: JiraApi> Clone for CachedJiraClient<A> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
      cache: self.cache.clone(),
    }
  }
}

impl<A: JiraApi> CachedJiraClient<A> {
  pub fn new(inner: A, cache: Arc<ObjectsCache>) -> Self {
    Self {
      inner: Arc::new(inner),
      cache: CacheLayer::new(cache),
    }
  }

  #[cfg(test)]
  pub fn inner(&self) -> &A {
    &self.inner
  }

  /// Synchronous look at the cache, without any remote call.
  ///
  /// `None` when nothing fresh is cached; otherwise the memoized outcome.
  pub fn peek<T>(&self, key: &JiraQueryKey<'_>) -> Option<Result<T, ApiError>>
  where
    T: serde::de::DeserializeOwned,
  {
    self
      .cache
      .cache()
      .get(&key.cache_key())
      .and_then(|entry| entry.outcome::<T, ApiError>())
  }

  /// Get a single issue by key with caching.
  pub async fn get_issue(&self, key: &str, options: &IssueOptions) -> Result<Issue, ApiError> {
    let query_key = JiraQueryKey::Issue { key, options };
    self
      .cache
      .fetch(&query_key, || self.inner.get_issue(key, options))
      .await
  }

  /// Search for issues using JQL with caching.
  pub async fn get_search_results(
    &self,
    query: &str,
    options: &SearchOptions,
  ) -> Result<SearchResults, ApiError> {
    let query_key = JiraQueryKey::Search { query, options };
    self
      .cache
      .fetch(&query_key, || self.inner.get_search_results(query, options))
      .await
  }

  pub async fn get_dev_status(
    &self,
    issue_id: &str,
    options: &AccountOptions,
  ) -> Result<DevStatus, ApiError> {
    let query_key = JiraQueryKey::DevStatus { issue_id, options };
    self
      .cache
      .fetch(&query_key, || self.inner.get_dev_status(issue_id, options))
      .await
  }

  /// Get the boards of a project with caching.
  pub async fn get_boards(&self, project: &str, options: &BoardOptions) -> Result<Vec<Board>, ApiError> {
    let query_key = JiraQueryKey::Boards { project, options };
    self
      .cache
      .fetch(&query_key, || self.inner.get_boards(project, options))
      .await
  }

  pub async fn get_sprint(&self, sprint_id: u64, options: &AccountOptions) -> Result<Sprint, ApiError> {
    let query_key = JiraQueryKey::Sprint { sprint_id, options };
    self
      .cache
      .fetch(&query_key, || self.inner.get_sprint(sprint_id, options))
      .await
  }

  /// Get the sprints of a board with caching.
  pub async fn get_sprints(
    &self,
    board_id: u64,
    options: &SprintOptions,
  ) -> Result<Vec<Sprint>, ApiError> {
    let query_key = JiraQueryKey::Sprints { board_id, options };
    self
      .cache
      .fetch(&query_key, || self.inner.get_sprints(board_id, options))
      .await
  }

  pub async fn get_logged_user(&self, options: &AccountOptions) -> Result<User, ApiError> {
    let query_key = JiraQueryKey::LoggedUser { options };
    self
      .cache
      .fetch(&query_key, || self.inner.get_logged_user(options))
      .await
  }

  /// Active sprint of a project.
  ///
  /// Looks up the first board of the project, then the first active sprint
  /// of that board. Each step is cached on its own key. A project without
  /// boards returns `None` without asking for sprints.
  pub async fn get_active_sprint(
    &self,
    project: &str,
    account: Option<&Account>,
  ) -> Result<Option<Sprint>, ApiError> {
    let board_options = BoardOptions {
      limit: Some(1),
      account: account.cloned(),
      ..Default::default()
    };
    let boards = self.get_boards(project, &board_options).await?;
    let Some(board) = boards.first() else {
      return Ok(None);
    };

    let sprint_options = SprintOptions {
      limit: Some(1),
      state: Some(vec![SprintState::Active]),
      account: account.cloned(),
      ..Default::default()
    };
    let sprints = self.get_sprints(board.id, &sprint_options).await?;
    Ok(sprints.into_iter().next())
  }

  /// Name of the active sprint, or an empty string when there is none.
  pub async fn get_active_sprint_name(
    &self,
    project: &str,
    account: Option<&Account>,
  ) -> Result<String, ApiError> {
    let sprint = self.get_active_sprint(project, account).await?;
    Ok(sprint.map(|s| s.name).unwrap_or_default())
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::cache::expiry::FixedExpiry;
  use crate::cache::ManualClock;
  use async_trait::async_trait;
  use chrono::Duration;
  use std::collections::{HashMap, VecDeque};
  use std::sync::Mutex;

  /// Remote call recorded by [`MockJira`]
  #[derive(Debug, Clone, PartialEq)]
  pub enum Call {
    Issue(String),
    Search(String, Option<u32>),
    DevStatus(String),
    Boards(String, Option<u32>),
    Sprint(u64),
    Sprints(u64, Option<Vec<SprintState>>, Option<u32>),
    LoggedUser,
  }

  /// Scripted remote layer that records every call.
  #[derive(Default)]
  pub struct MockJira {
    pub calls: Mutex<Vec<Call>>,
    pub issues: Mutex<HashMap<String, Result<Issue, ApiError>>>,
    pub searches: Mutex<VecDeque<Result<SearchResults, ApiError>>>,
    pub boards: Mutex<VecDeque<Result<Vec<Board>, ApiError>>>,
    pub sprints: Mutex<VecDeque<Result<Vec<Sprint>, ApiError>>>,
    /// Advanced by a second on every call when set
    pub clock: Mutex<Option<Arc<ManualClock>>>,
  }

  impl MockJira {
    pub fn record(&self, call: Call) {
      if let Some(clock) = self.clock.lock().unwrap().as_ref() {
        clock.advance(Duration::seconds(1));
      }
      self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
      self.calls.lock().unwrap().clone()
    }

    fn unscripted() -> ApiError {
      ApiError::request("mock", "unscripted call")
    }
  }

  #[async_trait]
  impl JiraApi for MockJira {
    async fn get_issue(&self, key: &str, _options: &IssueOptions) -> Result<Issue, ApiError> {
      self.record(Call::Issue(key.to_string()));
      self
        .issues
        .lock()
        .unwrap()
        .get(key)
        .cloned()
        .unwrap_or_else(|| Err(Self::unscripted()))
    }

    async fn get_search_results(
      &self,
      query: &str,
      options: &SearchOptions,
    ) -> Result<SearchResults, ApiError> {
      self.record(Call::Search(query.to_string(), options.limit));
      self
        .searches
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(Self::unscripted()))
    }

    async fn get_dev_status(&self, issue_id: &str, _options: &AccountOptions) -> Result<DevStatus, ApiError> {
      self.record(Call::DevStatus(issue_id.to_string()));
      Ok(DevStatus::default())
    }

    async fn get_boards(&self, project: &str, options: &BoardOptions) -> Result<Vec<Board>, ApiError> {
      self.record(Call::Boards(project.to_string(), options.limit));
      self
        .boards
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(Self::unscripted()))
    }

    async fn get_sprint(&self, sprint_id: u64, _options: &AccountOptions) -> Result<Sprint, ApiError> {
      self.record(Call::Sprint(sprint_id));
      Err(Self::unscripted())
    }

    async fn get_sprints(&self, board_id: u64, options: &SprintOptions) -> Result<Vec<Sprint>, ApiError> {
      self.record(Call::Sprints(board_id, options.state.clone(), options.limit));
      self
        .sprints
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(Self::unscripted()))
    }

    async fn get_logged_user(&self, _options: &AccountOptions) -> Result<User, ApiError> {
      self.record(Call::LoggedUser);
      Ok(User {
        display_name: "Me".to_string(),
        ..Default::default()
      })
    }
  }

  pub fn client(mock: MockJira) -> (CachedJiraClient<MockJira>, Arc<ObjectsCache>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let cache = Arc::new(ObjectsCache::with_clock(
      Arc::new(FixedExpiry("15m".to_string())),
      clock.clone(),
    ));
    (CachedJiraClient::new(mock, cache.clone()), cache, clock)
  }

  const PROJECT: &str = "projectKey";
  const BOARD_ID: u64 = 1234;

  fn board() -> Board {
    Board {
      id: BOARD_ID,
      name: "Board".to_string(),
      board_type: "scrum".to_string(),
    }
  }

  fn sprint() -> Sprint {
    Sprint {
      id: 567,
      name: "SprintName".to_string(),
      state: SprintState::Active,
      ..Default::default()
    }
  }

  fn boards_key() -> String {
    let options = BoardOptions {
      limit: Some(1),
      ..Default::default()
    };
    JiraQueryKey::Boards {
      project: PROJECT,
      options: &options,
    }
    .cache_key()
  }

  fn sprints_key() -> String {
    let options = SprintOptions {
      limit: Some(1),
      state: Some(vec![SprintState::Active]),
      ..Default::default()
    };
    JiraQueryKey::Sprints {
      board_id: BOARD_ID,
      options: &options,
    }
    .cache_key()
  }

  fn boards_call() -> Call {
    Call::Boards(PROJECT.to_string(), Some(1))
  }

  fn sprints_call() -> Call {
    Call::Sprints(BOARD_ID, Some(vec![SprintState::Active]), Some(1))
  }

  fn seed(cache: &ObjectsCache, key: &str, value: impl serde::Serialize) {
    cache.add(key, serde_json::to_value(value).unwrap(), false);
  }

  #[tokio::test]
  async fn test_active_sprint_cold_cache() {
    let mock = MockJira::default();
    mock.boards.lock().unwrap().push_back(Ok(vec![board()]));
    mock.sprints.lock().unwrap().push_back(Ok(vec![sprint()]));
    let (client, cache, clock) = client(mock);
    *client.inner.clock.lock().unwrap() = Some(clock);

    assert_eq!(client.get_active_sprint(PROJECT, None).await, Ok(Some(sprint())));

    assert_eq!(client.inner.calls(), vec![boards_call(), sprints_call()]);
    assert_eq!(cache.len(), 2);
    let boards_entry = cache.get(&boards_key()).unwrap();
    let sprints_entry = cache.get(&sprints_key()).unwrap();
    assert!(boards_key().contains(PROJECT));
    assert!(sprints_key().contains(&BOARD_ID.to_string()));
    assert_eq!(boards_entry.data, serde_json::to_value(vec![board()]).unwrap());
    assert_eq!(sprints_entry.data, serde_json::to_value(vec![sprint()]).unwrap());
    // Boards written before the sprints call went out
    assert!(boards_entry.timestamp < sprints_entry.timestamp);
    assert_eq!(sprints_entry.timestamp - boards_entry.timestamp, Duration::seconds(1));
  }

  #[tokio::test]
  async fn test_active_sprint_cached_board() {
    let mock = MockJira::default();
    mock.sprints.lock().unwrap().push_back(Ok(vec![sprint()]));
    let (client, cache, clock) = client(mock);
    seed(&cache, &boards_key(), vec![board()]);
    let boards_written = cache.get(&boards_key()).unwrap().timestamp;
    clock.advance(Duration::seconds(1));

    assert_eq!(client.get_active_sprint(PROJECT, None).await, Ok(Some(sprint())));

    assert_eq!(client.inner.calls(), vec![sprints_call()]);
    assert_eq!(cache.len(), 2);
    // Only the sprints entry was written
    assert_eq!(cache.get(&boards_key()).unwrap().timestamp, boards_written);
    assert!(cache.get(&sprints_key()).unwrap().timestamp > boards_written);
  }

  #[tokio::test]
  async fn test_active_sprint_fully_cached() {
    let (client, cache, clock) = client(MockJira::default());
    seed(&cache, &boards_key(), vec![board()]);
    seed(&cache, &sprints_key(), vec![sprint()]);
    let before = (cache.get(&boards_key()).unwrap(), cache.get(&sprints_key()).unwrap());
    clock.advance(Duration::seconds(1));

    assert_eq!(client.get_active_sprint(PROJECT, None).await, Ok(Some(sprint())));

    assert!(client.inner.calls().is_empty());
    let after = (cache.get(&boards_key()).unwrap(), cache.get(&sprints_key()).unwrap());
    assert_eq!(before, after);
  }

  #[tokio::test]
  async fn test_active_sprint_no_board() {
    let mock = MockJira::default();
    mock.boards.lock().unwrap().push_back(Ok(Vec::new()));
    let (client, cache, _) = client(mock);

    assert_eq!(client.get_active_sprint(PROJECT, None).await, Ok(None));
    assert_eq!(client.inner.calls(), vec![boards_call()]);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get(&boards_key()).unwrap().data, serde_json::json!([]));

    // The empty board list is memoized too
    assert_eq!(client.get_active_sprint_name(PROJECT, None).await, Ok(String::new()));
    assert_eq!(client.inner.calls(), vec![boards_call()]);
  }

  #[tokio::test]
  async fn test_active_sprint_board_without_sprint() {
    let mock = MockJira::default();
    mock.boards.lock().unwrap().push_back(Ok(vec![board()]));
    mock.sprints.lock().unwrap().push_back(Ok(Vec::new()));
    let (client, cache, _) = client(mock);

    assert_eq!(client.get_active_sprint(PROJECT, None).await, Ok(None));
    assert_eq!(client.inner.calls(), vec![boards_call(), sprints_call()]);
    assert_eq!(cache.get(&sprints_key()).unwrap().data, serde_json::json!([]));
  }

  #[tokio::test]
  async fn test_active_sprint_name() {
    let (client, cache, _) = client(MockJira::default());
    seed(&cache, &boards_key(), vec![board()]);
    seed(&cache, &sprints_key(), vec![sprint()]);

    assert_eq!(
      client.get_active_sprint_name(PROJECT, None).await,
      Ok("SprintName".to_string())
    );
  }

  #[tokio::test]
  async fn test_boards_error_is_memoized() {
    let mock = MockJira::default();
    let failure = ApiError::request("work", "HTTP status 500");
    mock.boards.lock().unwrap().push_back(Err(failure.clone()));
    mock.boards.lock().unwrap().push_back(Ok(vec![board()]));
    let (client, cache, clock) = client(mock);

    assert_eq!(client.get_active_sprint(PROJECT, None).await, Err(failure.clone()));
    assert_eq!(client.get_active_sprint(PROJECT, None).await, Err(failure));
    assert_eq!(client.inner.calls(), vec![boards_call()]);
    assert!(cache.get(&boards_key()).unwrap().is_error);

    // After expiry the call is retried
    clock.advance(Duration::minutes(15));
    client.inner.sprints.lock().unwrap().push_back(Ok(vec![sprint()]));
    assert_eq!(client.get_active_sprint(PROJECT, None).await, Ok(Some(sprint())));
    assert_eq!(client.inner.calls().len(), 3);
  }

  #[tokio::test]
  async fn test_issue_hit_and_peek() {
    let mock = MockJira::default();
    let issue = Issue {
      key: "AAA-123".to_string(),
      ..Default::default()
    };
    mock
      .issues
      .lock()
      .unwrap()
      .insert("AAA-123".to_string(), Ok(issue.clone()));
    let (client, _, _) = client(mock);
    let options = IssueOptions::default();
    let key = JiraQueryKey::Issue {
      key: "AAA-123",
      options: &options,
    };

    assert!(client.peek::<Issue>(&key).is_none());
    assert_eq!(client.get_issue("AAA-123", &options).await, Ok(issue.clone()));
    assert_eq!(client.get_issue("AAA-123", &options).await, Ok(issue.clone()));
    assert_eq!(client.peek::<Issue>(&key), Some(Ok(issue)));
    assert_eq!(client.inner.calls(), vec![Call::Issue("AAA-123".to_string())]);
  }

  #[tokio::test]
  async fn test_distinct_arguments_are_separate_calls() {
    let mock = MockJira::default();
    for _ in 0..3 {
      mock.searches.lock().unwrap().push_back(Ok(SearchResults::default()));
    }
    let (client, cache, _) = client(mock);
    let ten = SearchOptions {
      limit: Some(10),
      ..Default::default()
    };
    let one = SearchOptions {
      limit: Some(1),
      ..Default::default()
    };

    client.get_search_results("project = A", &ten).await.unwrap();
    client.get_search_results("project = A", &one).await.unwrap();
    client.get_search_results("project = B", &ten).await.unwrap();
    client.get_search_results("project = A", &ten).await.unwrap();

    assert_eq!(client.inner.calls().len(), 3);
    assert_eq!(cache.len(), 3);
  }

  #[tokio::test]
  async fn test_clear_forces_refetch() {
    let (client, cache, _) = client(MockJira::default());
    let options = AccountOptions::default();

    client.get_logged_user(&options).await.unwrap();
    cache.clear();
    client.get_logged_user(&options).await.unwrap();

    assert_eq!(client.inner.calls(), vec![Call::LoggedUser, Call::LoggedUser]);
  }
}
