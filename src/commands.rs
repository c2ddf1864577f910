/// Shell commands and autocomplete logic

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
  Issue,
  Search,
  Count,
  Sprint,
  Ttl,
  Clear,
  Reload,
  Whoami,
  Help,
  Quit,
}

#[derive(Debug, Clone)]
pub struct Command {
  pub kind: CommandKind,
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub usage: &'static str,
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    kind: CommandKind::Issue,
    name: "issue",
    aliases: &["i", "show"],
    usage: "issue <KEY>...",
    description: "Show issues by key",
  },
  Command {
    kind: CommandKind::Search,
    name: "search",
    aliases: &["s", "jql"],
    usage: "search <JQL>",
    description: "Search issues with JQL",
  },
  Command {
    kind: CommandKind::Count,
    name: "count",
    aliases: &["c", "total"],
    usage: "count <JQL>",
    description: "Count issues matching JQL",
  },
  Command {
    kind: CommandKind::Sprint,
    name: "sprint",
    aliases: &["sp"],
    usage: "sprint <PROJECT|SPRINT_ID>",
    description: "Active sprint of a project, or a sprint by id",
  },
  Command {
    kind: CommandKind::Ttl,
    name: "ttl",
    aliases: &["cache-time", "expiry"],
    usage: "ttl [DURATION]",
    description: "Show or set the cache time (e.g. 30s, 15m, 2h)",
  },
  Command {
    kind: CommandKind::Clear,
    name: "clear",
    aliases: &["flush", "reset"],
    usage: "clear",
    description: "Drop all cached results",
  },
  Command {
    kind: CommandKind::Reload,
    name: "reload",
    aliases: &["r", "config"],
    usage: "reload",
    description: "Re-read the config file (clears the cache if it changed)",
  },
  Command {
    kind: CommandKind::Whoami,
    name: "whoami",
    aliases: &["me", "user"],
    usage: "whoami [ACCOUNT]",
    description: "User an account is logged in as",
  },
  Command {
    kind: CommandKind::Help,
    name: "help",
    aliases: &["h", "?"],
    usage: "help",
    description: "List commands",
  },
  Command {
    kind: CommandKind::Quit,
    name: "quit",
    aliases: &["q", "exit"],
    usage: "quit",
    description: "Exit jissue",
  },
];

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    // Exact match on name
    if cmd.name == input_lower {
      matches.push((cmd, 0)); // Highest priority
      continue;
    }

    // Exact match on alias
    if cmd.aliases.contains(&input_lower.as_str()) {
      matches.push((cmd, 1));
      continue;
    }

    // Prefix match on name
    if cmd.name.starts_with(&input_lower) {
      matches.push((cmd, 2));
      continue;
    }

    // Prefix match on alias
    if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((cmd, 3));
      continue;
    }

    // Fuzzy match (contains)
    if cmd.name.contains(&input_lower) {
      matches.push((cmd, 4));
      continue;
    }

    // Fuzzy match on alias
    if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      matches.push((cmd, 5));
    }
  }

  // Sort by priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Split a shell line into the best matching command and its argument text
pub fn parse_line(line: &str) -> Option<(&'static Command, &str)> {
  let line = line.trim();
  if line.is_empty() {
    return None;
  }

  let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
  let command = get_suggestions(word).into_iter().next()?;
  Some((command, rest.trim()))
}

/// Help text listing every command
pub fn help() -> String {
  let width = COMMANDS.iter().map(|c| c.usage.len()).max().unwrap_or(0);
  COMMANDS
    .iter()
    .map(|c| format!("  {:<width$}  {}", c.usage, c.description, width = width))
    .collect::<Vec<_>>()
    .join("\n")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("search");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].kind, CommandKind::Search);
  }

  #[test]
  fn test_alias_match() {
    let suggestions = get_suggestions("q");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].kind, CommandKind::Quit);
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("spr");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].kind, CommandKind::Sprint);
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("oami");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].kind, CommandKind::Whoami);
  }

  #[test]
  fn test_parse_line() {
    let (command, rest) = parse_line("  s project = AAA AND status = Open ").unwrap();
    assert_eq!(command.kind, CommandKind::Search);
    assert_eq!(rest, "project = AAA AND status = Open");

    let (command, rest) = parse_line("clear").unwrap();
    assert_eq!(command.kind, CommandKind::Clear);
    assert_eq!(rest, "");

    assert!(parse_line("   ").is_none());
    assert!(parse_line("zzz").is_none());
  }

  #[test]
  fn test_help_lists_every_command() {
    let help = help();
    assert_eq!(help.lines().count(), COMMANDS.len());
    assert!(help.contains("ttl [DURATION]"));
  }
}
