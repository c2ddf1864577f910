//! Jira domain types.
//!
//! Every field has a default, and `null` decodes to that default, so a
//! decoded value is always structurally complete. Rendering code can read
//! `issue.fields.assignee.display_name` without checking for holes.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Decode `null` as the type's default.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Full issue details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Issue {
  #[serde(deserialize_with = "null_default")]
  pub id: String,
  #[serde(deserialize_with = "null_default")]
  pub key: String,
  #[serde(deserialize_with = "null_default")]
  pub fields: IssueFields,
  /// Alias of the account that returned this issue
  pub account: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueFields {
  #[serde(deserialize_with = "null_default")]
  pub summary: String,
  /// Plain text on API v2, a document tree on v3
  pub description: Value,
  /// Same format as `description`
  pub environment: Value,
  #[serde(deserialize_with = "null_default")]
  pub status: Status,
  #[serde(rename = "issuetype", deserialize_with = "null_default")]
  pub issue_type: NamedIcon,
  #[serde(deserialize_with = "null_default")]
  pub priority: NamedIcon,
  #[serde(deserialize_with = "null_default")]
  pub assignee: User,
  #[serde(deserialize_with = "null_default")]
  pub reporter: User,
  #[serde(deserialize_with = "null_default")]
  pub creator: User,
  #[serde(deserialize_with = "null_default")]
  pub created: String,
  #[serde(deserialize_with = "null_default")]
  pub updated: String,
  #[serde(rename = "duedate", deserialize_with = "null_default")]
  pub due_date: String,
  #[serde(rename = "resolutiondate", deserialize_with = "null_default")]
  pub resolution_date: String,
  #[serde(rename = "lastViewed", deserialize_with = "null_default")]
  pub last_viewed: String,
  #[serde(deserialize_with = "null_default")]
  pub resolution: Resolution,
  #[serde(deserialize_with = "null_default")]
  pub project: Project,
  #[serde(deserialize_with = "null_default")]
  pub labels: Vec<String>,
  #[serde(deserialize_with = "null_default")]
  pub components: Vec<Component>,
  #[serde(rename = "fixVersions", deserialize_with = "null_default")]
  pub fix_versions: Vec<Version>,
  #[serde(rename = "timeestimate", deserialize_with = "null_default")]
  pub time_estimate: i64,
  #[serde(rename = "timeoriginalestimate", deserialize_with = "null_default")]
  pub time_original_estimate: i64,
  #[serde(rename = "timespent", deserialize_with = "null_default")]
  pub time_spent: i64,
  #[serde(rename = "aggregatetimeestimate", deserialize_with = "null_default")]
  pub aggregate_time_estimate: i64,
  #[serde(rename = "aggregatetimeoriginalestimate", deserialize_with = "null_default")]
  pub aggregate_time_original_estimate: i64,
  #[serde(rename = "aggregatetimespent", deserialize_with = "null_default")]
  pub aggregate_time_spent: i64,
  #[serde(deserialize_with = "null_default")]
  pub progress: Progress,
  #[serde(rename = "aggregateprogress", deserialize_with = "null_default")]
  pub aggregate_progress: Progress,
  /// Custom fields and anything else not modelled above
  #[serde(flatten)]
  pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct User {
  #[serde(deserialize_with = "null_default")]
  pub active: bool,
  #[serde(deserialize_with = "null_default")]
  pub display_name: String,
  #[serde(deserialize_with = "null_default")]
  pub name: String,
  #[serde(deserialize_with = "null_default")]
  pub key: String,
  #[serde(deserialize_with = "null_default")]
  pub account_id: String,
  #[serde(deserialize_with = "null_default")]
  pub email_address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Status {
  #[serde(deserialize_with = "null_default")]
  pub name: String,
  #[serde(deserialize_with = "null_default")]
  pub description: String,
  #[serde(deserialize_with = "null_default")]
  pub status_category: StatusCategory,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatusCategory {
  #[serde(deserialize_with = "null_default")]
  pub color_name: String,
}

/// Issue type or priority
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NamedIcon {
  #[serde(deserialize_with = "null_default")]
  pub name: String,
  #[serde(deserialize_with = "null_default")]
  pub icon_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resolution {
  #[serde(deserialize_with = "null_default")]
  pub name: String,
  #[serde(deserialize_with = "null_default")]
  pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
  #[serde(deserialize_with = "null_default")]
  pub key: String,
  #[serde(deserialize_with = "null_default")]
  pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Component {
  #[serde(deserialize_with = "null_default")]
  pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Version {
  #[serde(deserialize_with = "null_default")]
  pub name: String,
  #[serde(deserialize_with = "null_default")]
  pub description: String,
  #[serde(deserialize_with = "null_default")]
  pub released: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Progress {
  #[serde(deserialize_with = "null_default")]
  pub percent: i64,
}

/// Result page of a JQL search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchResults {
  #[serde(deserialize_with = "null_default")]
  pub issues: Vec<Issue>,
  #[serde(deserialize_with = "null_default")]
  pub start_at: u64,
  #[serde(deserialize_with = "null_default")]
  pub max_results: u64,
  #[serde(deserialize_with = "null_default")]
  pub total: u64,
  pub account: Option<String>,
}

/// Board summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Board {
  pub id: u64,
  #[serde(deserialize_with = "null_default")]
  pub name: String,
  /// "scrum" or "kanban"
  #[serde(rename = "type", deserialize_with = "null_default")]
  pub board_type: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SprintState {
  Closed,
  Active,
  #[default]
  Future,
}

impl SprintState {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Closed => "closed",
      Self::Active => "active",
      Self::Future => "future",
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Sprint {
  pub id: u64,
  #[serde(deserialize_with = "null_default")]
  pub state: SprintState,
  #[serde(deserialize_with = "null_default")]
  pub name: String,
  #[serde(deserialize_with = "null_default")]
  pub start_date: String,
  #[serde(deserialize_with = "null_default")]
  pub end_date: String,
  #[serde(deserialize_with = "null_default")]
  pub complete_date: String,
  #[serde(deserialize_with = "null_default")]
  pub activated_date: String,
  #[serde(deserialize_with = "null_default")]
  pub origin_board_id: u64,
  #[serde(deserialize_with = "null_default")]
  pub goal: String,
}

/// Development information (pull requests, builds, ...) linked to an issue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevStatus {
  #[serde(deserialize_with = "null_default")]
  pub summary: DevSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevSummary {
  #[serde(rename = "pullrequest", deserialize_with = "null_default")]
  pub pull_request: PullRequestSummary,
  #[serde(deserialize_with = "null_default")]
  pub build: CountSummary,
  #[serde(deserialize_with = "null_default")]
  pub review: CountSummary,
  #[serde(deserialize_with = "null_default")]
  pub repository: CountSummary,
  #[serde(deserialize_with = "null_default")]
  pub branch: CountSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PullRequestSummary {
  #[serde(deserialize_with = "null_default")]
  pub overall: PullRequestOverall,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PullRequestOverall {
  #[serde(deserialize_with = "null_default")]
  pub count: u64,
  #[serde(deserialize_with = "null_default")]
  pub last_updated: String,
  #[serde(deserialize_with = "null_default")]
  pub state: String,
  #[serde(deserialize_with = "null_default")]
  pub details: PullRequestDetails,
  #[serde(deserialize_with = "null_default")]
  pub open: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PullRequestDetails {
  #[serde(deserialize_with = "null_default")]
  pub open_count: u64,
  #[serde(deserialize_with = "null_default")]
  pub merged_count: u64,
  #[serde(deserialize_with = "null_default")]
  pub declined_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountSummary {
  #[serde(deserialize_with = "null_default")]
  pub overall: Count,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Count {
  #[serde(deserialize_with = "null_default")]
  pub count: u64,
}
