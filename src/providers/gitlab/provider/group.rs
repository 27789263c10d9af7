use futures::stream::{self, StreamExt, TryStreamExt};
use log::info;
use serde::de::IgnoredAny;

use super::core::{unavailable_as_empty, GitLabProvider, MAX_ANALYZED_ITEMS};
use crate::error::{GlInsightsError, Result};
use crate::insights::{GroupProject, GroupProjectMetrics, GroupProjectsReport};
use crate::providers::gitlab::client::fetch_all;
use crate::providers::gitlab::types::ProjectDto;
use crate::providers::gitlab::url_utils::{group_endpoint, project_endpoint};

const MAX_GROUP_PROJECTS: usize = 100;
/// Projects whose metrics are fetched at once.
const METRICS_CONCURRENCY: usize = 8;

impl GitLabProvider {
    pub async fn group_projects(
        &self,
        group: &str,
        with_metrics: bool,
    ) -> Result<GroupProjectsReport> {
        info!("Listing projects of group: {group}");

        let projects: Vec<ProjectDto> = fetch_all(
            self.api.as_ref(),
            &group_endpoint(group, "projects"),
            &[],
            Some(MAX_GROUP_PROJECTS),
        )
        .await
        .map_err(|err| match err {
            GlInsightsError::NotFound(_) => {
                GlInsightsError::NotFound(format!("Group '{group}' not found"))
            }
            other => other,
        })?;

        let metrics: Vec<Option<GroupProjectMetrics>> = if with_metrics {
            stream::iter(&projects)
                .map(|project| async move { self.project_metrics(project).await.map(Some) })
                .buffered(METRICS_CONCURRENCY)
                .try_collect()
                .await?
        } else {
            vec![None; projects.len()]
        };

        let projects: Vec<GroupProject> = projects
            .into_iter()
            .zip(metrics)
            .map(|(dto, metrics)| GroupProject {
                id: dto.id,
                name: dto.name,
                path_with_namespace: dto.path_with_namespace,
                web_url: dto.web_url,
                star_count: dto.star_count,
                forks_count: dto.forks_count,
                last_activity_at: dto.last_activity_at,
                metrics,
            })
            .collect();

        Ok(GroupProjectsReport {
            group: group.to_string(),
            total_projects: projects.len(),
            projects,
        })
    }

    async fn project_metrics(&self, project: &ProjectDto) -> Result<GroupProjectMetrics> {
        let api = self.api.as_ref();
        let id = project.id.to_string();
        let path = project.path_with_namespace.as_str();
        let opened = [("state", "opened".to_string())];
        let merge_requests_path = project_endpoint(&id, "merge_requests");
        let pipelines_path = project_endpoint(&id, "pipelines");

        let (merge_requests, pipelines) = tokio::try_join!(
            async {
                let result = fetch_all::<IgnoredAny>(
                    api,
                    &merge_requests_path,
                    &opened,
                    Some(MAX_ANALYZED_ITEMS),
                )
                .await;
                unavailable_as_empty(result, "merge requests", path)
            },
            async {
                let result = fetch_all::<IgnoredAny>(api, &pipelines_path, &[], Some(1)).await;
                unavailable_as_empty(result, "pipelines", path)
            },
        )?;

        Ok(GroupProjectMetrics {
            open_merge_requests: merge_requests.len(),
            open_issues: project.open_issues_count.unwrap_or(0),
            has_pipelines: !pipelines.is_empty(),
        })
    }
}
