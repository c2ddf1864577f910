//! Plain-text formatting of issues, search tables, counts and sprints.

use serde_json::Value;
use std::collections::HashMap;

use super::view::ViewState;
use crate::config::SearchColumn;
use crate::jira::types::{DevStatus, Issue, SearchResults, Sprint};

const SUMMARY_WIDTH: usize = 60;

/// Truncate a string to a maximum number of chars, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// One-char marker for a status category color
pub fn status_marker(color_name: &str) -> char {
  match color_name {
    "green" => '+',
    "yellow" => '~',
    "blue-gray" | "medium-gray" => '-',
    _ => ' ',
  }
}

/// Date part of a Jira timestamp ("2024-01-31T10:00:00.000+0000" -> "2024-01-31")
pub fn short_date(timestamp: &str) -> &str {
  timestamp.get(..10).unwrap_or(timestamp)
}

/// Single-line text of a rich field: a plain string on API v2, a document
/// tree on v3.
pub fn plain_text(value: &Value) -> String {
  let mut text = String::new();
  collect_text(value, &mut text);
  text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(value: &Value, out: &mut String) {
  match value {
    Value::String(s) => out.push_str(s),
    Value::Object(node) => {
      if let Some(Value::String(text)) = node.get("text") {
        out.push_str(text);
      }
      if let Some(Value::Array(children)) = node.get("content") {
        for child in children {
          collect_text(child, out);
        }
        out.push(' ');
      }
    }
    _ => {}
  }
}

/// Time tracking value in seconds as "1h30m", empty for zero
pub fn tracked_time(seconds: i64) -> String {
  if seconds <= 0 {
    return String::new();
  }
  let (h, m, s) = (seconds / 3600, seconds % 3600 / 60, seconds % 60);
  let mut text = String::new();
  for (amount, unit) in [(h, 'h'), (m, 'm'), (s, 's')] {
    if amount > 0 {
      text.push_str(&format!("{}{}", amount, unit));
    }
  }
  text
}

/// Inline tag of an issue.
///
/// `[Bug] AAA-123 Fix login | In Progress`, or just key and status when
/// compact.
pub fn issue_tag(issue: &Issue, compact: bool) -> String {
  let status = &issue.fields.status;
  let marker = status_marker(&status.status_category.color_name);
  if compact {
    return format!("{} [{}{}]", issue.key, marker, status.name);
  }

  format!(
    "[{}] {} {} | {}{}",
    issue.fields.issue_type.name,
    issue.key,
    truncate(&issue.fields.summary, SUMMARY_WIDTH),
    marker,
    status.name
  )
}

pub fn issue_error(key: &str, message: &str) -> String {
  format!("[!] {}: {}", key, message)
}

pub fn loading(label: &str) -> String {
  format!("... {}", label)
}

/// Inline rendering of an issue view
pub fn issue_view(key: &str, compact: bool, state: &ViewState<Issue>) -> String {
  match state {
    ViewState::Loading => loading(key),
    ViewState::Ready(issue) => issue_tag(issue, compact),
    ViewState::Failed(e) => issue_error(key, e),
  }
}

pub fn column_header(column: SearchColumn) -> &'static str {
  match column {
    SearchColumn::Key => "Key",
    SearchColumn::Summary => "Summary",
    SearchColumn::Description => "Description",
    SearchColumn::Type => "T",
    SearchColumn::Created => "Created",
    SearchColumn::Updated => "Updated",
    SearchColumn::Reporter => "Reporter",
    SearchColumn::Assignee => "Assignee",
    SearchColumn::Priority => "P",
    SearchColumn::Status => "Status",
    SearchColumn::DueDate => "Due",
    SearchColumn::Resolution => "Resolution",
    SearchColumn::ResolutionDate => "Resolved",
    SearchColumn::Environment => "Environment",
    SearchColumn::Labels => "Labels",
    SearchColumn::Project => "Project",
    SearchColumn::FixVersions => "Fix versions",
    SearchColumn::Components => "Components",
    SearchColumn::TimeEstimate => "Remaining",
    SearchColumn::TimeOriginalEstimate => "Estimate",
    SearchColumn::TimeSpent => "Spent",
    SearchColumn::AggregateTimeEstimate => "Total remaining",
    SearchColumn::AggregateTimeOriginalEstimate => "Total estimate",
    SearchColumn::AggregateTimeSpent => "Total spent",
    SearchColumn::Progress => "Progress",
    SearchColumn::AggregateProgress => "Total progress",
    SearchColumn::LastViewed => "Viewed",
    SearchColumn::DevStatus => "Dev",
  }
}

/// Pull request summary of an issue, e.g. "PR 2 open, 1 merged"
pub fn dev_status_cell(status: Option<&DevStatus>) -> String {
  let Some(status) = status else {
    return String::new();
  };
  let overall = &status.summary.pull_request.overall;
  if overall.count == 0 {
    return String::new();
  }

  let details = &overall.details;
  let mut parts = Vec::new();
  if details.open_count > 0 {
    parts.push(format!("{} open", details.open_count));
  }
  if details.merged_count > 0 {
    parts.push(format!("{} merged", details.merged_count));
  }
  if details.declined_count > 0 {
    parts.push(format!("{} declined", details.declined_count));
  }
  if parts.is_empty() {
    format!("PR {}", overall.count)
  } else {
    format!("PR {}", parts.join(", "))
  }
}

pub fn column_cell(column: SearchColumn, issue: &Issue, dev: Option<&DevStatus>) -> String {
  let fields = &issue.fields;
  match column {
    SearchColumn::Key => issue.key.clone(),
    SearchColumn::Summary => truncate(&fields.summary, SUMMARY_WIDTH),
    SearchColumn::Description => truncate(&plain_text(&fields.description), SUMMARY_WIDTH),
    SearchColumn::Type => fields.issue_type.name.clone(),
    SearchColumn::Created => short_date(&fields.created).to_string(),
    SearchColumn::Updated => short_date(&fields.updated).to_string(),
    SearchColumn::Reporter => fields.reporter.display_name.clone(),
    SearchColumn::Assignee => fields.assignee.display_name.clone(),
    SearchColumn::Priority => fields.priority.name.clone(),
    SearchColumn::Status => fields.status.name.clone(),
    SearchColumn::DueDate => short_date(&fields.due_date).to_string(),
    SearchColumn::Resolution => fields.resolution.name.clone(),
    SearchColumn::ResolutionDate => short_date(&fields.resolution_date).to_string(),
    SearchColumn::Environment => truncate(&plain_text(&fields.environment), SUMMARY_WIDTH),
    SearchColumn::Labels => fields.labels.join(", "),
    SearchColumn::Project => fields.project.key.clone(),
    // Released versions are starred
    SearchColumn::FixVersions => fields
      .fix_versions
      .iter()
      .map(|v| if v.released { format!("{}*", v.name) } else { v.name.clone() })
      .collect::<Vec<_>>()
      .join(", "),
    SearchColumn::Components => fields
      .components
      .iter()
      .map(|c| c.name.as_str())
      .collect::<Vec<_>>()
      .join(", "),
    SearchColumn::TimeEstimate => tracked_time(fields.time_estimate),
    SearchColumn::TimeOriginalEstimate => tracked_time(fields.time_original_estimate),
    SearchColumn::TimeSpent => tracked_time(fields.time_spent),
    SearchColumn::AggregateTimeEstimate => tracked_time(fields.aggregate_time_estimate),
    SearchColumn::AggregateTimeOriginalEstimate => tracked_time(fields.aggregate_time_original_estimate),
    SearchColumn::AggregateTimeSpent => tracked_time(fields.aggregate_time_spent),
    SearchColumn::Progress => format!("{}%", fields.progress.percent),
    SearchColumn::AggregateProgress => format!("{}%", fields.aggregate_progress.percent),
    SearchColumn::LastViewed => short_date(&fields.last_viewed).to_string(),
    SearchColumn::DevStatus => dev_status_cell(dev),
  }
}

/// Search results with the development status of their issues
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchTable {
  pub results: SearchResults,
  /// Keyed by issue id
  pub dev_status: HashMap<String, DevStatus>,
}

/// Aligned text table of search results.
pub fn search_table(table: &SearchTable, columns: &[SearchColumn]) -> String {
  let mut rows: Vec<Vec<String>> = vec![columns.iter().map(|c| column_header(*c).to_string()).collect()];
  for issue in &table.results.issues {
    let dev = table.dev_status.get(&issue.id);
    rows.push(columns.iter().map(|c| column_cell(*c, issue, dev)).collect());
  }

  let widths: Vec<usize> = (0..columns.len())
    .map(|i| rows.iter().map(|row| row[i].chars().count()).max().unwrap_or(0))
    .collect();

  let mut lines: Vec<String> = rows
    .iter()
    .map(|row| {
      row
        .iter()
        .zip(&widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
    })
    .collect();

  let results = &table.results;
  lines.push(format!(
    "Showing {} of {} issues",
    results.issues.len(),
    results.total
  ));
  lines.join("\n")
}

pub fn search_view(label: &str, state: &ViewState<SearchTable>, columns: &[SearchColumn]) -> String {
  match state {
    ViewState::Loading => loading(label),
    ViewState::Ready(table) => search_table(table, columns),
    ViewState::Failed(e) => issue_error(label, e),
  }
}

/// "<label>: <total>", or just the total without a label
pub fn count(label: Option<&str>, total: u64) -> String {
  match label {
    Some(label) => format!("{}: {}", label, total),
    None => total.to_string(),
  }
}

pub fn count_view(label: Option<&str>, query: &str, state: &ViewState<SearchResults>) -> String {
  match state {
    ViewState::Loading => loading(label.unwrap_or(query)),
    ViewState::Ready(results) => count(label, results.total),
    ViewState::Failed(e) => issue_error(label.unwrap_or(query), e),
  }
}

/// Sprint name with its dates and goal
pub fn sprint(project: &str, sprint: Option<&Sprint>) -> String {
  let Some(sprint) = sprint else {
    return format!("{}: no active sprint", project);
  };

  let mut line = format!("{}: {} [{}]", project, sprint.name, sprint.state.as_str());
  if !sprint.start_date.is_empty() || !sprint.end_date.is_empty() {
    line.push_str(&format!(
      " {} -> {}",
      short_date(&sprint.start_date),
      short_date(&sprint.end_date)
    ));
  }
  if !sprint.goal.is_empty() {
    line.push_str(&format!("\n  Goal: {}", sprint.goal));
  }
  line
}
