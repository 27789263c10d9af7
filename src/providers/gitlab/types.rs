use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectDto {
    pub id: u64,
    pub name: String,
    pub path_with_namespace: String,
    pub web_url: String,
    pub description: Option<String>,
    pub default_branch: Option<String>,
    pub visibility: Option<String>,
    #[serde(default)]
    pub star_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    /// Absent when the issue tracker is disabled.
    #[serde(default)]
    pub open_issues_count: Option<u64>,
    pub last_activity_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserRef {
    pub username: String,
    pub name: Option<String>,
}

impl UserRef {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.username)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitDto {
    pub author_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MergeRequestDto {
    pub state: String,
    pub author: Option<UserRef>,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueDto {
    pub iid: u64,
    pub title: String,
    pub state: String,
    #[serde(default)]
    pub labels: Vec<String>,
    pub assignee: Option<UserRef>,
    #[serde(default)]
    pub discussion_locked: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentDto {
    pub status: String,
}

/// Minimal REST pipeline shape used for "latest pipeline" lookups.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineListDto {
    pub id: u64,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventDto {
    pub action_name: String,
    pub author: Option<UserRef>,
    pub author_username: Option<String>,
    pub target_type: Option<String>,
    pub target_title: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl EventDto {
    pub fn username(&self) -> &str {
        self.author
            .as_ref()
            .map(|author| author.username.as_str())
            .or(self.author_username.as_deref())
            .unwrap_or("unknown")
    }
}

/// Entry of `GET /projects/:id/repository/tree`.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeEntryDto {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl TreeEntryDto {
    pub fn is_blob(&self) -> bool {
        self.kind == "blob"
    }
}
