use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::api::GitLabApi;
use crate::error::{GlInsightsError, Result};

/// GraphQL query for fetching recent pipelines, newest first
const PIPELINES_QUERY: &str = r#"
query RecentPipelines($projectPath: ID!, $first: Int!, $after: String, $ref: String) {
  project(fullPath: $projectPath) {
    pipelines(first: $first, after: $after, ref: $ref) {
      pageInfo {
        hasNextPage
        endCursor
      }
      nodes {
        id
        status
        ref
        createdAt
        duration
      }
    }
  }
}
"#;

/// Variables for pipeline GraphQL queries
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineQueryVariables {
    pub project_path: String,
    pub first: i32,
    pub after: Option<String>,
    #[serde(rename = "ref")]
    pub ref_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineQueryResponse {
    pub project: Option<ProjectData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectData {
    pub pipelines: Option<PipelineConnection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConnection {
    pub page_info: PageInfo,
    pub nodes: Vec<Option<PipelineNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// A pipeline as reported by GraphQL. `id` is a global id such as
/// `gid://gitlab/Ci::Pipeline/123`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineNode {
    pub id: String,
    pub status: String,
    #[serde(rename = "ref")]
    pub ref_: Option<String>,
    pub created_at: DateTime<Utc>,
    pub duration: Option<u64>,
}

/// Fetch pipelines using GraphQL with cursor-based pagination.
///
/// `project_path` must be a full path (`group/project`); GraphQL does not
/// accept numeric project ids.
///
/// # Errors
/// Returns `NotFound` when GitLab reports no such project, and propagates
/// transport and GraphQL errors from the client.
pub async fn fetch_pipelines(
    api: &dyn GitLabApi,
    project_path: &str,
    limit: usize,
    branch: Option<&str>,
) -> Result<Vec<PipelineNode>> {
    const PAGE_SIZE: usize = 100;

    let mut all_pipelines = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let remaining = limit.saturating_sub(all_pipelines.len());
        if remaining == 0 {
            break;
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let fetch_count = std::cmp::min(remaining, PAGE_SIZE) as i32;

        let variables = PipelineQueryVariables {
            project_path: project_path.to_string(),
            first: fetch_count,
            after: cursor.clone(),
            ref_name: branch.map(ToString::to_string),
        };

        let data = api
            .graphql(
                PIPELINES_QUERY,
                "RecentPipelines",
                serde_json::to_value(variables)?,
            )
            .await?;
        let response: PipelineQueryResponse = serde_json::from_value(data)?;

        let project = response.project.ok_or_else(|| {
            GlInsightsError::NotFound(format!("Project '{project_path}' not found"))
        })?;

        let pipelines = project.pipelines.ok_or_else(|| GlInsightsError::Api {
            status: 200,
            message: format!("No pipeline data available for project '{project_path}'"),
        })?;

        all_pipelines.extend(pipelines.nodes.into_iter().flatten());

        if !pipelines.page_info.has_next_page || all_pipelines.len() >= limit {
            break;
        }

        cursor = pipelines.page_info.end_cursor;

        // hasNextPage without a cursor would repeat the first page
        if cursor.is_none() {
            break;
        }
    }

    all_pipelines.truncate(limit);

    Ok(all_pipelines)
}
