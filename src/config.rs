use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::cache::expiry::{ExpirySource, DEFAULT_CACHE_TIME};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub accounts: Vec<Account>,
  /// Time before cached results expire, e.g. "15m"
  pub cache_time: String,
  /// Default `limit` for search blocks that don't set one
  pub search_results_limit: u32,
  /// Prefix that marks an inline issue tag in notes (e.g. "JIRA:ABC-123")
  pub inline_issue_prefix: String,
  pub search_columns: Vec<SearchColumn>,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      accounts: Vec::new(),
      cache_time: DEFAULT_CACHE_TIME.to_string(),
      search_results_limit: 10,
      inline_issue_prefix: "JIRA:".to_string(),
      search_columns: vec![
        SearchColumn::Key,
        SearchColumn::Summary,
        SearchColumn::Type,
        SearchColumn::Created,
        SearchColumn::Updated,
        SearchColumn::Reporter,
        SearchColumn::Assignee,
        SearchColumn::Priority,
        SearchColumn::Status,
      ],
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchColumn {
  Key,
  Summary,
  Description,
  Type,
  Created,
  Updated,
  Reporter,
  Assignee,
  Priority,
  Status,
  DueDate,
  Resolution,
  ResolutionDate,
  Environment,
  Labels,
  Project,
  FixVersions,
  Components,
  /// Time tracking, in seconds on the issue
  TimeEstimate,
  TimeOriginalEstimate,
  TimeSpent,
  /// Time tracking summed over sub-tasks
  AggregateTimeEstimate,
  AggregateTimeOriginalEstimate,
  AggregateTimeSpent,
  Progress,
  AggregateProgress,
  LastViewed,
  /// Pull request summary, one extra request per issue
  DevStatus,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
  /// No credentials
  #[default]
  Open,
  /// Username + password (or API token)
  Basic,
  /// Jira Cloud - email + API token as Basic auth
  Cloud,
  /// Personal access token sent as Bearer
  Bearer,
}

#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Account {
  pub alias: String,
  pub host: String,
  #[serde(default)]
  pub auth_type: AuthType,
  #[serde(default)]
  pub username: Option<String>,
  /// Password or token. Never serialized.
  #[serde(default, skip_serializing)]
  pub password: String,
  /// Lower is tried first
  #[serde(default = "default_priority")]
  pub priority: u32,
  #[serde(default)]
  pub color: Option<String>,
}

fn default_priority() -> u32 {
  1
}

impl std::fmt::Debug for Account {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Account")
      .field("alias", &self.alias)
      .field("host", &self.host)
      .field("auth_type", &self.auth_type)
      .field("username", &self.username)
      .field("priority", &self.priority)
      .field("color", &self.color)
      .finish_non_exhaustive()
  }
}

impl Account {
  /// Stable identity of this account for cache keys.
  ///
  /// Covers host, alias and username so two accounts never share cached
  /// results, without leaking credentials into keys or logs.
  pub fn fingerprint(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.host.as_bytes());
    hasher.update(b"\n");
    hasher.update(self.alias.as_bytes());
    hasher.update(b"\n");
    hasher.update(self.username.as_deref().unwrap_or("").as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..16].to_string()
  }
}

impl Settings {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./jissue.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/jissue/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/jissue/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("jissue.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("jissue").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let mut settings: Settings = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    settings.normalize_accounts();
    for account in &mut settings.accounts {
      if account.password.is_empty() && account.auth_type != AuthType::Open {
        if let Some(token) = Self::get_token(&account.alias) {
          account.password = token;
        }
      }
    }

    Ok(settings)
  }

  /// Sort accounts by priority and resolve alias/priority conflicts.
  ///
  /// Duplicate aliases get a numeric suffix; priorities are renumbered
  /// 1..n in sorted order when two accounts share one.
  pub fn normalize_accounts(&mut self) {
    self.accounts.sort_by_key(|a| a.priority);

    let mut aliases = HashSet::new();
    for account in &mut self.accounts {
      if !aliases.insert(account.alias.clone()) {
        let mut n = 2;
        while aliases.contains(&format!("{}-{}", account.alias, n)) {
          n += 1;
        }
        account.alias = format!("{}-{}", account.alias, n);
        aliases.insert(account.alias.clone());
      }
    }

    let mut priorities = HashSet::new();
    if !self.accounts.iter().all(|a| priorities.insert(a.priority)) {
      for (i, account) in self.accounts.iter_mut().enumerate() {
        account.priority = i as u32 + 1;
      }
    }
  }

  /// Find an account by alias (case-insensitive).
  pub fn account(&self, alias: &str) -> Option<&Account> {
    self
      .accounts
      .iter()
      .find(|a| a.alias.eq_ignore_ascii_case(alias))
  }

  /// Get an account token from environment variables.
  ///
  /// Checks JISSUE_TOKEN_<ALIAS> first, then JISSUE_TOKEN as fallback.
  fn get_token(alias: &str) -> Option<String> {
    let scoped = format!(
      "JISSUE_TOKEN_{}",
      alias
        .to_uppercase()
        .replace(|c: char| !c.is_ascii_alphanumeric(), "_")
    );
    std::env::var(scoped)
      .or_else(|_| std::env::var("JISSUE_TOKEN"))
      .ok()
  }
}

/// Shared, updatable settings.
#[derive(Debug, Clone, Default)]
pub struct SettingsHandle {
  inner: Arc<RwLock<Settings>>,
}

impl SettingsHandle {
  pub fn new(settings: Settings) -> Self {
    Self {
      inner: Arc::new(RwLock::new(settings)),
    }
  }

  /// Snapshot of the current settings.
  pub fn get(&self) -> Settings {
    self
      .inner
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  /// Replace the settings. Returns whether anything changed.
  pub fn replace(&self, settings: Settings) -> bool {
    let mut current = self.inner.write().unwrap_or_else(PoisonError::into_inner);
    if *current == settings {
      return false;
    }
    *current = settings;
    true
  }
}

impl ExpirySource for SettingsHandle {
  fn cache_time(&self) -> String {
    self
      .inner
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .cache_time
      .clone()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  fn account(alias: &str, priority: u32) -> Account {
    Account {
      alias: alias.to_string(),
      host: "https://example.atlassian.net".to_string(),
      auth_type: AuthType::Open,
      username: None,
      password: String::new(),
      priority,
      color: None,
    }
  }

  #[test]
  fn test_defaults_fill_missing_fields() {
    let settings: Settings = serde_yaml::from_str("cache_time: 5m\n").unwrap();
    assert_eq!(settings.cache_time, "5m");
    assert_eq!(settings.search_results_limit, 10);
    assert_eq!(settings.inline_issue_prefix, "JIRA:");
    assert_eq!(settings.search_columns.len(), 9);
    assert!(settings.accounts.is_empty());
  }

  #[test]
  fn test_search_columns_from_yaml() {
    let settings: Settings =
      serde_yaml::from_str("search_columns: [key, summary, dev_status]\n").unwrap();
    assert_eq!(
      settings.search_columns,
      vec![SearchColumn::Key, SearchColumn::Summary, SearchColumn::DevStatus]
    );
  }

  #[test]
  fn test_snake_case_column_names() {
    let settings: Settings = serde_yaml::from_str(
      "search_columns: [due_date, fix_versions, aggregate_time_spent, last_viewed]\n",
    )
    .unwrap();
    assert_eq!(
      settings.search_columns,
      vec![
        SearchColumn::DueDate,
        SearchColumn::FixVersions,
        SearchColumn::AggregateTimeSpent,
        SearchColumn::LastViewed,
      ]
    );
    assert!(serde_yaml::from_str::<Settings>("search_columns: [notes]\n").is_err());
  }

  #[test]
  fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
      file,
      "accounts:\n  - alias: work\n    host: https://work.atlassian.net\n    auth_type: open\n    priority: 2\n  - alias: home\n    host: https://home.example.com\n    priority: 1\ncache_time: 1h\n"
    )
    .unwrap();

    let settings = Settings::load(Some(file.path())).unwrap();
    assert_eq!(settings.cache_time, "1h");
    assert_eq!(settings.accounts[0].alias, "home");
    assert_eq!(settings.accounts[1].alias, "work");
  }

  #[test]
  fn test_load_missing_explicit_path() {
    let err = Settings::load(Some(Path::new("/definitely/not/here.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }

  #[test]
  fn test_normalize_resolves_conflicts() {
    let mut settings = Settings {
      accounts: vec![account("a", 1), account("a", 1), account("b", 3)],
      ..Settings::default()
    };
    settings.normalize_accounts();

    let aliases: Vec<_> = settings.accounts.iter().map(|a| a.alias.as_str()).collect();
    assert_eq!(aliases, vec!["a", "a-2", "b"]);
    let priorities: Vec<_> = settings.accounts.iter().map(|a| a.priority).collect();
    assert_eq!(priorities, vec![1, 2, 3]);
  }

  #[test]
  fn test_fingerprint_distinguishes_accounts() {
    let a = account("a", 1);
    let mut b = account("a", 1);
    b.host = "https://other.atlassian.net".to_string();
    let mut c = account("a", 1);
    c.password = "secret".to_string();

    assert_eq!(a.fingerprint().len(), 16);
    assert_ne!(a.fingerprint(), b.fingerprint());
    // Credentials don't change identity
    assert_eq!(a.fingerprint(), c.fingerprint());
  }

  #[test]
  fn test_handle_replace_reports_change() {
    let handle = SettingsHandle::new(Settings::default());
    assert!(!handle.replace(Settings::default()));

    let changed = Settings {
      cache_time: "1m".to_string(),
      ..Settings::default()
    };
    assert!(handle.replace(changed));
    assert_eq!(handle.cache_time(), "1m");
  }

  #[test]
  fn test_account_lookup_ignores_case() {
    let settings = Settings {
      accounts: vec![account("Work", 1)],
      ..Settings::default()
    };
    assert!(settings.account("work").is_some());
    assert!(settings.account("home").is_none());
  }
}
