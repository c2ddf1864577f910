use color_eyre::{eyre::eyre, Result};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::cache::expiry::parse_cache_time;
use crate::cache::ObjectsCache;
use crate::commands::{self, CommandKind};
use crate::config::{Account, Settings, SettingsHandle};
use crate::jira::client::{JiraApi, JiraClient};
use crate::jira::options::AccountOptions;
use crate::jira::CachedJiraClient;
use crate::render::{text, RenderedBlock, Renderer, SearchBlock};

/// Command line overrides applied on top of the settings file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
  pub config: Option<PathBuf>,
  pub account: Option<String>,
  pub cache_time: Option<String>,
}

impl Overrides {
  pub fn apply(&self, mut settings: Settings) -> Settings {
    if let Some(cache_time) = &self.cache_time {
      settings.cache_time = cache_time.clone();
    }
    settings
  }

  /// Load the settings file and apply the overrides
  pub fn load_settings(&self) -> Result<Settings> {
    Ok(self.apply(Settings::load(self.config.as_deref())?))
  }
}

/// What the shell should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  Output(String),
  Quit,
}

/// Main application state
///
/// Owns the settings, the process-wide cache and the cached client. The
/// cache lives as long as the app, so a shell session reuses results
/// across commands.
pub struct App<A: JiraApi = JiraClient> {
  settings: SettingsHandle,
  cache: Arc<ObjectsCache>,
  renderer: Renderer<A>,
  overrides: Overrides,
}

impl App {
  pub fn new(settings: Settings, overrides: Overrides) -> Self {
    let handle = SettingsHandle::new(settings);
    let cache = Arc::new(ObjectsCache::new(Arc::new(handle.clone())));
    let client = CachedJiraClient::new(JiraClient::new(handle.clone()), cache.clone());
    Self::with_client(handle, cache, client, overrides)
  }
}

impl<A: JiraApi + 'static> App<A> {
  pub fn with_client(
    settings: SettingsHandle,
    cache: Arc<ObjectsCache>,
    client: CachedJiraClient<A>,
    overrides: Overrides,
  ) -> Self {
    let renderer = Renderer::new(client, settings.clone());
    Self {
      settings,
      cache,
      renderer,
      overrides,
    }
  }

  /// Swap in new settings. A change clears the cache.
  pub fn update_settings(&self, settings: Settings) -> bool {
    if !self.settings.replace(settings) {
      debug!("Settings unchanged");
      return false;
    }

    let entries = self.cache.len();
    self.cache.clear();
    info!(entries, "Settings changed, cache cleared");
    true
  }

  pub fn clear_cache(&self) {
    let entries = self.cache.len();
    self.cache.clear();
    info!(entries, "Cache cleared");
  }

  /// Set the cache time for this session.
  ///
  /// Cached entries are kept; their freshness is judged against the new
  /// value from the next lookup on.
  pub fn set_cache_time(&self, value: &str) -> Result<()> {
    if parse_cache_time(value).is_none() {
      return Err(eyre!(
        "Invalid cache time '{}', expected a number followed by s, m or h",
        value
      ));
    }

    let settings = Settings {
      cache_time: value.trim().to_string(),
      ..self.settings.get()
    };
    self.settings.replace(settings);
    info!(cache_time = value, "Cache time changed");
    Ok(())
  }

  fn account(&self) -> Result<Option<Account>, crate::jira::ApiError> {
    self.renderer.account(self.overrides.account.as_deref())
  }

  pub async fn issues(&self, keys: &[&str]) -> String {
    let account = match self.account() {
      Ok(account) => account,
      Err(e) => return text::issue_error(&keys.join(" "), &e.to_string()),
    };

    let mut lines = Vec::new();
    for key in keys {
      let mut view = self.renderer.issue(key, account.clone());
      view.settle().await;
      lines.push(text::issue_view(key, false, view.state()));
    }
    lines.join("\n")
  }

  pub async fn search(&self, query: &str, limit: Option<u32>) -> String {
    let search = SearchBlock {
      query: query.to_string(),
      limit,
      account: self.overrides.account.clone(),
      ..Default::default()
    };
    let mut view = self.renderer.search(&search);
    view.settle().await;
    text::search_view(query, view.state(), &self.settings.get().search_columns)
  }

  pub async fn count(&self, query: &str) -> String {
    let search = SearchBlock {
      query: query.to_string(),
      account: self.overrides.account.clone(),
      ..Default::default()
    };
    let mut view = self.renderer.count(&search);
    view.settle().await;
    text::count_view(None, query, view.state())
  }

  /// Active sprint of a project, or a sprint by numeric id
  pub async fn sprint(&self, target: &str) -> String {
    let account = match self.account() {
      Ok(account) => account,
      Err(e) => return text::issue_error(target, &e.to_string()),
    };

    if let Ok(sprint_id) = target.parse::<u64>() {
      return match self.renderer.sprint(sprint_id, account).await {
        Ok(sprint) => text::sprint(&format!("#{}", sprint_id), Some(&sprint)),
        Err(e) => text::issue_error(target, &e.to_string()),
      };
    }

    match self.renderer.active_sprint(target, account.as_ref()).await {
      Ok(sprint) => text::sprint(target, sprint.as_ref()),
      Err(e) => text::issue_error(target, &e.to_string()),
    }
  }

  /// User an account is logged in as.
  ///
  /// Without an alias, the `--account` override or else the first account
  /// that answers.
  pub async fn whoami(&self, alias: Option<&str>) -> String {
    let alias = alias.or(self.overrides.account.as_deref());
    let account = match self.renderer.account(alias) {
      Ok(account) => account,
      Err(e) => return text::issue_error("whoami", &e.to_string()),
    };
    let label = account
      .as_ref()
      .map(|a| a.alias.clone())
      .unwrap_or_else(|| "default".to_string());

    match self
      .renderer
      .client()
      .get_logged_user(&AccountOptions { account })
      .await
    {
      Ok(user) if user.email_address.is_empty() => format!("{}: {}", label, user.display_name),
      Ok(user) => format!("{}: {} <{}>", label, user.display_name, user.email_address),
      Err(e) => text::issue_error(&label, &e.to_string()),
    }
  }

  /// Render every Jira reference of a note.
  ///
  /// References not cached yet are first written as placeholders, then
  /// everything is written again once all loads have finished.
  pub async fn render_note(&self, note: &str, out: &mut impl Write) -> Result<()> {
    let columns = self.settings.get().search_columns;
    let mut blocks = self.renderer.note(note, self.overrides.account.as_deref());
    for block in &mut blocks {
      block.poll();
    }

    if blocks.iter().any(RenderedBlock::is_loading) {
      write_blocks(&blocks, &columns, out)?;
      writeln!(out, "---")?;
      for block in &mut blocks {
        block.settle().await;
      }
    }

    write_blocks(&blocks, &columns, out)?;
    Ok(())
  }

  /// Run one shell line
  pub async fn execute(&self, line: &str) -> Outcome {
    let Some((command, args)) = commands::parse_line(line) else {
      if line.trim().is_empty() {
        return Outcome::Output(String::new());
      }
      return Outcome::Output(format!("Unknown command: {}\n{}", line.trim(), commands::help()));
    };
    debug!(command = command.name, args, "Shell command");

    let needs_args = matches!(
      command.kind,
      CommandKind::Issue | CommandKind::Search | CommandKind::Count | CommandKind::Sprint
    );
    if needs_args && args.is_empty() {
      return Outcome::Output(format!("Usage: {}", command.usage));
    }

    let output = match command.kind {
      CommandKind::Issue => {
        let keys: Vec<&str> = args.split_whitespace().collect();
        self.issues(&keys).await
      }
      CommandKind::Search => self.search(args, None).await,
      CommandKind::Count => self.count(args).await,
      CommandKind::Sprint => self.sprint(args).await,
      CommandKind::Ttl if args.is_empty() => format!("Cache time: {}", self.settings.get().cache_time),
      CommandKind::Ttl => match self.set_cache_time(args) {
        Ok(()) => format!("Cache time set to {}", args),
        Err(e) => e.to_string(),
      },
      CommandKind::Clear => {
        self.clear_cache();
        "Cache cleared".to_string()
      }
      CommandKind::Reload => match self.overrides.load_settings() {
        Ok(settings) => {
          if self.update_settings(settings) {
            "Settings reloaded, cache cleared".to_string()
          } else {
            "Settings unchanged".to_string()
          }
        }
        Err(e) => e.to_string(),
      },
      CommandKind::Whoami => self.whoami((!args.is_empty()).then_some(args)).await,
      CommandKind::Help => commands::help(),
      CommandKind::Quit => return Outcome::Quit,
    };
    Outcome::Output(output)
  }

  /// Line-oriented session on stdin/stdout
  pub async fn run_shell(&self) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = std::io::stdout();

    write!(stdout, "jissue> ")?;
    stdout.flush()?;
    while let Some(line) = lines.next_line().await? {
      match self.execute(&line).await {
        Outcome::Quit => break,
        Outcome::Output(output) if output.is_empty() => {}
        Outcome::Output(output) => writeln!(stdout, "{}", output)?,
      }
      write!(stdout, "jissue> ")?;
      stdout.flush()?;
    }
    writeln!(stdout)?;

    Ok(())
  }
}

fn write_blocks(
  blocks: &[RenderedBlock],
  columns: &[crate::config::SearchColumn],
  out: &mut impl Write,
) -> Result<()> {
  for block in blocks {
    writeln!(out, "line {}:", block.line() + 1)?;
    for line in block.to_text(columns).lines() {
      writeln!(out, "  {}", line)?;
    }
  }
  Ok(())
}
