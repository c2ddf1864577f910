//! Rendering of Jira references as text.
//!
//! Every render starts from what the cache already knows and only goes to
//! the remote API for the rest, see [`View`].

pub mod note;
pub mod text;
pub mod view;

use futures::future::join_all;
use std::collections::HashMap;
use tracing::debug;

use crate::config::{Account, SearchColumn, SettingsHandle};
use crate::jira::cache::JiraQueryKey;
use crate::jira::client::{JiraApi, JiraClient};
use crate::jira::options::{AccountOptions, IssueOptions, SearchOptions};
use crate::jira::types::{Issue, SearchResults, Sprint};
use crate::jira::{ApiError, CachedJiraClient};

pub use note::{Block, SearchBlock};
pub use text::SearchTable;
pub use view::View;

/// A note reference together with its pending or resolved data
#[derive(Debug)]
pub enum RenderedBlock {
  Issues {
    line: usize,
    compact: bool,
    issues: Vec<(String, View<Issue>)>,
  },
  Search {
    line: usize,
    search: SearchBlock,
    view: View<SearchTable>,
  },
  Count {
    line: usize,
    search: SearchBlock,
    view: View<SearchResults>,
  },
}

impl RenderedBlock {
  pub fn line(&self) -> usize {
    match self {
      RenderedBlock::Issues { line, .. }
      | RenderedBlock::Search { line, .. }
      | RenderedBlock::Count { line, .. } => *line,
    }
  }

  pub fn is_loading(&self) -> bool {
    match self {
      RenderedBlock::Issues { issues, .. } => issues.iter().any(|(_, v)| v.is_loading()),
      RenderedBlock::Search { view, .. } => view.is_loading(),
      RenderedBlock::Count { view, .. } => view.is_loading(),
    }
  }

  /// Pick up loads that finished in the meantime. Returns whether anything
  /// changed.
  pub fn poll(&mut self) -> bool {
    match self {
      RenderedBlock::Issues { issues, .. } => issues
        .iter_mut()
        .fold(false, |changed, (_, view)| view.poll() || changed),
      RenderedBlock::Search { view, .. } => view.poll(),
      RenderedBlock::Count { view, .. } => view.poll(),
    }
  }

  /// Wait for every pending load of this block.
  pub async fn settle(&mut self) {
    match self {
      RenderedBlock::Issues { issues, .. } => {
        for (_, view) in issues.iter_mut() {
          view.settle().await;
        }
      }
      RenderedBlock::Search { view, .. } => view.settle().await,
      RenderedBlock::Count { view, .. } => view.settle().await,
    }
  }

  pub fn to_text(&self, columns: &[SearchColumn]) -> String {
    match self {
      RenderedBlock::Issues { compact, issues, .. } => issues
        .iter()
        .map(|(key, view)| text::issue_view(key, *compact, view.state()))
        .collect::<Vec<_>>()
        .join("\n"),
      RenderedBlock::Search { search, view, .. } => {
        let label = search.label.as_deref().unwrap_or(&search.query);
        text::search_view(label, view.state(), columns)
      }
      RenderedBlock::Count { search, view, .. } => {
        text::count_view(search.label.as_deref(), &search.query, view.state())
      }
    }
  }
}

/// Builds views of issues, searches, counts and sprints
pub struct Renderer<A: JiraApi = JiraClient> {
  client: CachedJiraClient<A>,
  settings: SettingsHandle,
}

impl<A: JiraApi> Clone for Renderer<A> {
  fn clone(&self) -> Self {
    Self {
      client: self.client.clone(),
      settings: self.settings.clone(),
    }
  }
}

impl<A: JiraApi + 'static> Renderer<A> {
  pub fn new(client: CachedJiraClient<A>, settings: SettingsHandle) -> Self {
    Self { client, settings }
  }

  pub fn client(&self) -> &CachedJiraClient<A> {
    &self.client
  }

  /// Resolve an account alias. `None` means all accounts in priority order.
  pub fn account(&self, alias: Option<&str>) -> Result<Option<Account>, ApiError> {
    match alias {
      None => Ok(None),
      Some(alias) => self
        .settings
        .get()
        .account(alias)
        .cloned()
        .map(Some)
        .ok_or_else(|| ApiError::UnknownAccount(alias.to_string())),
    }
  }

  pub fn issue(&self, key: &str, account: Option<Account>) -> View<Issue> {
    let options = IssueOptions {
      account,
      ..Default::default()
    };
    let cached = self.client.peek(&JiraQueryKey::Issue {
      key,
      options: &options,
    });

    let client = self.client.clone();
    let key = key.to_string();
    View::resolve(cached, async move { client.get_issue(&key, &options).await })
  }

  /// Issues of a search, plus development status when the table shows it.
  pub fn search(&self, search: &SearchBlock) -> View<SearchTable> {
    let settings = self.settings.get();
    let account = match self.account(search.account.as_deref()) {
      Ok(account) => account,
      Err(e) => return View::ready(Err(e)),
    };
    let options = SearchOptions {
      limit: Some(search.limit.unwrap_or(settings.search_results_limit)),
      account,
      ..Default::default()
    };
    let with_dev_status = settings.search_columns.contains(&SearchColumn::DevStatus);

    let cached = self
      .client
      .peek::<SearchResults>(&JiraQueryKey::Search {
        query: &search.query,
        options: &options,
      })
      .filter(|_| !with_dev_status)
      .map(|outcome| {
        outcome.map(|results| SearchTable {
          results,
          dev_status: HashMap::new(),
        })
      });

    let client = self.client.clone();
    let accounts = settings.accounts;
    let query = search.query.clone();
    View::resolve(cached, async move {
      let results = client.get_search_results(&query, &options).await?;
      let dev_status = if with_dev_status {
        dev_status_of(&client, &results, &accounts).await
      } else {
        HashMap::new()
      };
      Ok(SearchTable { results, dev_status })
    })
  }

  /// Total of a search; asks for a single result.
  pub fn count(&self, search: &SearchBlock) -> View<SearchResults> {
    let account = match self.account(search.account.as_deref()) {
      Ok(account) => account,
      Err(e) => return View::ready(Err(e)),
    };
    let options = SearchOptions {
      limit: Some(1),
      account,
      ..Default::default()
    };
    let cached = self.client.peek(&JiraQueryKey::Search {
      query: &search.query,
      options: &options,
    });

    let client = self.client.clone();
    let query = search.query.clone();
    View::resolve(cached, async move {
      client.get_search_results(&query, &options).await
    })
  }

  pub async fn active_sprint(&self, project: &str, account: Option<&Account>) -> Result<Option<Sprint>, ApiError> {
    self.client.get_active_sprint(project, account).await
  }

  pub async fn sprint(&self, sprint_id: u64, account: Option<Account>) -> Result<Sprint, ApiError> {
    self
      .client
      .get_sprint(sprint_id, &AccountOptions { account })
      .await
  }

  /// Start rendering every reference of a note.
  ///
  /// Inline tags of the same line are grouped into one block. `account` is
  /// asked for issues and for searches that don't name their own account.
  pub fn note(&self, note: &str, account: Option<&str>) -> Vec<RenderedBlock> {
    let settings = self.settings.get();
    let resolved = self.account(account);
    let issue_view = |key: &str| match &resolved {
      Ok(account) => self.issue(key, account.clone()),
      Err(e) => View::ready(Err(e.clone())),
    };
    let mut rendered: Vec<RenderedBlock> = Vec::new();

    for block in note::scan(note, &settings.inline_issue_prefix) {
      match block {
        Block::Inline { line, key, compact } => {
          let view = issue_view(&key);
          if let Some(RenderedBlock::Issues {
            line: last,
            compact: last_compact,
            issues,
          }) = rendered.last_mut()
          {
            if *last == line && *last_compact == compact {
              issues.push((key, view));
              continue;
            }
          }
          rendered.push(RenderedBlock::Issues {
            line,
            compact,
            issues: vec![(key, view)],
          });
        }
        Block::Issues { line, keys } => rendered.push(RenderedBlock::Issues {
          line,
          compact: false,
          issues: keys
            .into_iter()
            .map(|key| {
              let view = issue_view(&key);
              (key, view)
            })
            .collect(),
        }),
        Block::Search { line, search } => {
          let search = search.or_account(account);
          let view = self.search(&search);
          rendered.push(RenderedBlock::Search { line, search, view });
        }
        Block::Count { line, search } => {
          let search = search.or_account(account);
          let view = self.count(&search);
          rendered.push(RenderedBlock::Count { line, search, view });
        }
      }
    }

    debug!(blocks = rendered.len(), "Rendered note");
    rendered
  }
}

/// Development status of every issue of a search, asking the account that
/// returned the issue. Failures leave the issue out.
async fn dev_status_of<A: JiraApi>(
  client: &CachedJiraClient<A>,
  results: &SearchResults,
  accounts: &[Account],
) -> HashMap<String, crate::jira::types::DevStatus> {
  let lookups = results.issues.iter().map(|issue| {
    let options = AccountOptions {
      account: issue
        .account
        .as_deref()
        .and_then(|alias| accounts.iter().find(|a| a.alias == alias))
        .cloned(),
    };
    async move {
      let status = client.get_dev_status(&issue.id, &options).await;
      (issue.id.clone(), status)
    }
  });

  join_all(lookups)
    .await
    .into_iter()
    .filter_map(|(id, status)| status.ok().map(|s| (id, s)))
    .collect()
}
