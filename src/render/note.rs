//! Scanning of markdown notes for Jira references.
//!
//! Two kinds of references are recognised:
//!
//! - inline tags, `<prefix><KEY>` anywhere in a line outside code fences
//!   (`JIRA:AAA-123`); a `-` right after the prefix asks for the compact
//!   form (`JIRA:-AAA-123`)
//! - fenced blocks tagged `jira-issue`, `jira-search` or `jira-count`

/// Marker between prefix and key that selects the compact tag
const COMPACT_MARKER: char = '-';

/// Parameters of a `jira-search` / `jira-count` block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchBlock {
  pub query: String,
  pub limit: Option<u32>,
  pub label: Option<String>,
  /// Alias of the account to ask, otherwise all in priority order
  pub account: Option<String>,
}

impl SearchBlock {
  /// Parse the body of a search block.
  ///
  /// A body made of `key: value` lines sets the fields by name; any other
  /// body is the JQL query itself, lines joined with spaces.
  pub fn parse(body: &str) -> Self {
    let lines: Vec<&str> = body.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let structured = lines.iter().any(|line| Self::field(line).is_some());

    if !structured {
      return Self {
        query: lines.join(" "),
        ..Default::default()
      };
    }

    let mut block = Self::default();
    for line in lines {
      match Self::field(line) {
        Some(("query", value)) => block.query = value.to_string(),
        Some(("limit", value)) => block.limit = value.parse().ok(),
        Some(("label", value)) => block.label = Some(value.to_string()),
        Some(("account", value)) => block.account = Some(value.to_string()),
        _ => {}
      }
    }
    block
  }

  /// Fall back to `account` when the block doesn't name one.
  pub fn or_account(self, account: Option<&str>) -> Self {
    Self {
      account: self.account.or_else(|| account.map(str::to_string)),
      ..self
    }
  }

  fn field(line: &str) -> Option<(&str, &str)> {
    let (name, value) = line.split_once(':')?;
    let name = name.trim();
    matches!(name, "query" | "limit" | "label" | "account").then(|| (name, value.trim()))
  }
}

/// A Jira reference found in a note
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
  /// Inline tag on a line of text
  Inline { line: usize, key: String, compact: bool },
  /// `jira-issue` fence, one key per line
  Issues { line: usize, keys: Vec<String> },
  Search { line: usize, search: SearchBlock },
  Count { line: usize, search: SearchBlock },
}

/// Length of the issue key at the start of `text`, if there is one.
///
/// Keys look like `[A-Z][A-Z0-9]*-[0-9]+`.
pub fn issue_key_len(text: &str) -> Option<usize> {
  let bytes = text.as_bytes();
  if !bytes.first()?.is_ascii_uppercase() {
    return None;
  }

  let project = bytes
    .iter()
    .take_while(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    .count();
  if bytes.get(project) != Some(&b'-') {
    return None;
  }

  let number = bytes[project + 1..]
    .iter()
    .take_while(|b| b.is_ascii_digit())
    .count();
  (number > 0).then_some(project + 1 + number)
}

pub fn is_issue_key(text: &str) -> bool {
  issue_key_len(text) == Some(text.len())
}

/// Inline tags of a single line
pub fn inline_tags(line: &str, prefix: &str) -> Vec<(String, bool)> {
  let mut tags = Vec::new();
  if prefix.is_empty() {
    return tags;
  }

  let mut rest = line;
  while let Some(start) = rest.find(prefix) {
    rest = &rest[start + prefix.len()..];
    let (compact, candidate) = match rest.strip_prefix(COMPACT_MARKER) {
      Some(stripped) => (true, stripped),
      None => (false, rest),
    };
    if let Some(len) = issue_key_len(candidate) {
      tags.push((candidate[..len].to_string(), compact));
      rest = &candidate[len..];
    }
  }
  tags
}

/// All Jira references of a note, in document order.
///
/// An unterminated fence runs to the end of the note.
pub fn scan(note: &str, prefix: &str) -> Vec<Block> {
  let mut blocks = Vec::new();
  let mut fence: Option<(usize, String, Vec<&str>)> = None;

  for (number, line) in note.lines().enumerate() {
    let trimmed = line.trim();

    if let Some((start, tag, body)) = &mut fence {
      if trimmed.starts_with("```") {
        if let Some(block) = fenced_block(*start, tag, &body.join("\n")) {
          blocks.push(block);
        }
        fence = None;
      } else {
        body.push(line);
      }
      continue;
    }

    if let Some(info) = trimmed.strip_prefix("```") {
      fence = Some((number, info.trim().to_string(), Vec::new()));
      continue;
    }

    for (key, compact) in inline_tags(line, prefix) {
      blocks.push(Block::Inline {
        line: number,
        key,
        compact,
      });
    }
  }

  if let Some((start, tag, body)) = fence {
    if let Some(block) = fenced_block(start, &tag, &body.join("\n")) {
      blocks.push(block);
    }
  }

  blocks
}

fn fenced_block(line: usize, tag: &str, body: &str) -> Option<Block> {
  match tag {
    "jira-issue" => Some(Block::Issues {
      line,
      keys: body
        .lines()
        .map(str::trim)
        .filter(|l| is_issue_key(l))
        .map(str::to_string)
        .collect(),
    }),
    "jira-search" => Some(Block::Search {
      line,
      search: SearchBlock::parse(body),
    }),
    "jira-count" => Some(Block::Count {
      line,
      search: SearchBlock::parse(body),
    }),
    _ => None,
  }
}
