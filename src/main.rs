mod app;
mod cache;
mod commands;
mod config;
mod jira;
mod render;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::{App, Overrides};

#[derive(Parser, Debug)]
#[command(name = "jissue")]
#[command(about = "Render Jira issues, searches and counts from the terminal and from markdown notes")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./jissue.yaml, then $XDG_CONFIG_HOME/jissue/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Account alias to ask instead of trying every account by priority
  #[arg(short, long, global = true)]
  account: Option<String>,

  /// Cache time override, e.g. 30s, 15m, 2h
  #[arg(long, global = true)]
  cache_time: Option<String>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Show issues by key
  Issue {
    #[arg(required = true)]
    keys: Vec<String>,
  },
  /// Search issues with JQL
  Search {
    jql: String,
    /// Maximum number of results (default: search_results_limit)
    #[arg(short, long)]
    limit: Option<u32>,
  },
  /// Count issues matching JQL
  Count { jql: String },
  /// Active sprint of a project, or a sprint by numeric id
  Sprint { target: String },
  /// Render every Jira reference of a markdown note
  Render { file: PathBuf },
  /// User an account is logged in as
  Whoami { account: Option<String> },
  /// Interactive session that keeps the cache between commands (default)
  Shell,
}

/// Log to `<data_dir>/jissue/jissue.log`, filtered by `JISSUE_LOG`.
///
/// Rendered output goes to stdout, so logs never go to the terminal.
fn init_logging() -> Result<WorkerGuard> {
  let log_dir = dirs::data_dir()
    .ok_or_else(|| eyre!("Could not determine data directory"))?
    .join("jissue");
  std::fs::create_dir_all(&log_dir)?;

  let appender = tracing_appender::rolling::never(&log_dir, "jissue.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_env("JISSUE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .init();

  Ok(guard)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
  color_eyre::install()?;
  let _guard = init_logging()?;

  let args = Args::parse();
  let overrides = Overrides {
    config: args.config,
    account: args.account,
    cache_time: args.cache_time,
  };
  let settings = overrides.load_settings()?;
  if let Some(alias) = &overrides.account {
    if settings.account(alias).is_none() {
      return Err(eyre!("Unknown account: {}", alias));
    }
  }
  tracing::info!(accounts = settings.accounts.len(), cache_time = %settings.cache_time, "Starting");

  let app = App::new(settings, overrides);
  match args.command.unwrap_or(Command::Shell) {
    Command::Issue { keys } => {
      let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
      println!("{}", app.issues(&keys).await);
    }
    Command::Search { jql, limit } => println!("{}", app.search(&jql, limit).await),
    Command::Count { jql } => println!("{}", app.count(&jql).await),
    Command::Sprint { target } => println!("{}", app.sprint(&target).await),
    Command::Render { file } => {
      let note = std::fs::read_to_string(&file)
        .map_err(|e| eyre!("Failed to read {}: {}", file.display(), e))?;
      app.render_note(&note, &mut std::io::stdout()).await?;
    }
    Command::Whoami { account } => println!("{}", app.whoami(account.as_deref()).await),
    Command::Shell => app.run_shell().await?,
  }

  Ok(())
}
