use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: u64,
    pub name: String,
    pub path_with_namespace: String,
    pub web_url: String,
    pub description: Option<String>,
    pub default_branch: Option<String>,
    pub visibility: Option<String>,
    pub star_count: u64,
    pub forks_count: u64,
    pub open_issues_count: u64,
    pub last_activity_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: u64,
    pub status: String,
    #[serde(rename = "ref")]
    pub ref_: Option<String>,
    pub created_at: DateTime<Utc>,
    pub duration_seconds: Option<u64>,
    pub web_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub project: String,
    pub collected_at: DateTime<Utc>,
    pub total_pipelines: usize,
    pub successful_pipelines: usize,
    pub failed_pipelines: usize,
    pub success_rate: f64,
    pub avg_duration_seconds: f64,
    pub status_counts: IndexMap<String, usize>,
    /// Newest first, in the order GitLab reported them.
    pub pipelines: Vec<PipelineRun>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorStat {
    pub commits: usize,
    pub merged_merge_requests: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributorReport {
    pub project: String,
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
    pub total_commits: usize,
    pub total_merged_merge_requests: usize,
    pub contributors: IndexMap<String, ContributorStat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestFormat {
    Cargo,
    Npm,
    Pip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    Normal,
    Dev,
    Build,
    Optional,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyFinding {
    pub name: String,
    pub kind: DependencyKind,
    pub requirement: String,
    pub current_version: Option<String>,
    pub latest_version: Option<String>,
    pub stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyReport {
    pub project: String,
    pub manifest_path: String,
    pub format: ManifestFormat,
    pub total_dependencies: usize,
    pub stale_dependencies: usize,
    pub findings: Vec<DependencyFinding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeRequestReport {
    pub project: String,
    pub timeframe: String,
    pub days: i64,
    pub total: usize,
    pub opened: usize,
    pub merged: usize,
    pub closed: usize,
    pub merge_rate: f64,
    pub avg_review_hours: f64,
    pub top_authors: Vec<RankedCount>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticalIssue {
    pub iid: u64,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueAgeBuckets {
    pub under_one_day: usize,
    pub one_to_seven_days: usize,
    pub one_to_four_weeks: usize,
    pub over_one_month: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueReport {
    pub project: String,
    pub label: Option<String>,
    pub total: usize,
    pub opened: usize,
    pub closed: usize,
    pub locked: usize,
    pub open_issue_age: IssueAgeBuckets,
    pub top_labels: Vec<RankedCount>,
    pub top_assignees: Vec<RankedCount>,
    pub critical_issues: Vec<CriticalIssue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoraLevel {
    Elite,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoraReport {
    pub project: String,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    pub period_days: i64,
    pub deployment_frequency_per_day: f64,
    pub lead_time_days: f64,
    pub time_to_restore_hours: f64,
    pub change_failure_rate: f64,
    pub level: DoraLevel,
    pub deployments: usize,
    pub failed_deployments: usize,
    pub releases: usize,
    pub merged_merge_requests: usize,
    pub incidents: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    NeedsAttention,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDeduction {
    pub reason: String,
    pub points: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub project: String,
    pub name: String,
    pub days_since_activity: Option<i64>,
    pub open_merge_requests: usize,
    pub open_issues: usize,
    pub latest_pipeline_status: Option<String>,
    pub score: u32,
    pub status: HealthStatus,
    pub deductions: Vec<HealthDeduction>,
}

/// Occurrences of one category and its share of the total, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Share {
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyEvent {
    pub author: String,
    pub action: String,
    pub target_type: Option<String>,
    pub target_title: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityReport {
    pub project: String,
    pub name: String,
    pub since: chrono::NaiveDate,
    pub until: chrono::NaiveDate,
    pub days: i64,
    pub total_events: usize,
    /// Keyed by GitLab `action_name`, most frequent first.
    pub actions: IndexMap<String, Share>,
    pub recent_key_events: Vec<KeyEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupProjectMetrics {
    pub open_merge_requests: usize,
    pub open_issues: u64,
    pub has_pipelines: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupProject {
    pub id: u64,
    pub name: String,
    pub path_with_namespace: String,
    pub web_url: String,
    pub star_count: u64,
    pub forks_count: u64,
    pub last_activity_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<GroupProjectMetrics>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupProjectsReport {
    pub group: String,
    pub total_projects: usize,
    pub projects: Vec<GroupProject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadmeDocument {
    pub project: String,
    pub file_path: String,
    #[serde(rename = "ref")]
    pub ref_: Option<String>,
    /// Length of the full file in characters.
    pub size_chars: usize,
    pub truncated: bool,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadmeFilesReport {
    pub project: String,
    #[serde(rename = "ref")]
    pub ref_: Option<String>,
    pub total_files: usize,
    /// Directory (`.` for the repository root) to file names, both sorted.
    pub directories: IndexMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextStats {
    pub file_path: String,
    pub size_chars: usize,
    pub lines: usize,
    pub words: usize,
    pub avg_line_length: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadmeStatsReport {
    pub project: String,
    #[serde(rename = "ref")]
    pub ref_: Option<String>,
    pub total_files: usize,
    pub root_files: usize,
    pub nested_files: usize,
    /// Lowercase extension (`none` when absent), most frequent first.
    pub extensions: IndexMap<String, Share>,
    pub main_readme: Option<TextStats>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadmeMatch {
    pub line: usize,
    pub context: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadmeSearchReport {
    pub project: String,
    pub file_path: String,
    pub term: String,
    pub case_sensitive: bool,
    pub total_matches: usize,
    /// First matches only; `total_matches` counts all of them.
    pub matches: Vec<ReadmeMatch>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadmeRating {
    Excellent,
    Good,
    Fair,
    NeedsWork,
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityCheck {
    pub name: &'static str,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadmeQualityReport {
    pub project: String,
    pub file_path: String,
    pub score: usize,
    pub max_score: usize,
    pub percentage: f64,
    pub rating: ReadmeRating,
    pub checks: Vec<QualityCheck>,
    pub recommendations: Vec<String>,
    pub lines: usize,
    pub words: usize,
}
