use log::info;

use super::core::{project_context, GitLabProvider};
use crate::error::Result;
use crate::insights::ProjectSummary;
use crate::providers::gitlab::types::ProjectDto;
use crate::providers::gitlab::url_utils::{is_numeric_reference, project_endpoint};

impl GitLabProvider {
    pub(super) async fn fetch_project(&self, project: &str) -> Result<ProjectDto> {
        let value = self
            .api
            .get(&project_endpoint(project, ""), &[])
            .await
            .map_err(project_context(project))?;

        Ok(serde_json::from_value(value)?)
    }

    pub async fn project_overview(&self, project: &str) -> Result<ProjectSummary> {
        info!("Collecting project overview for: {project}");

        let dto = self.fetch_project(project).await?;
        Ok(Self::summarize_project(dto))
    }

    /// Full `group/project` path for a reference that may be a numeric id.
    pub(super) async fn resolve_project_path(&self, project: &str) -> Result<String> {
        if is_numeric_reference(project) {
            Ok(self.fetch_project(project).await?.path_with_namespace)
        } else {
            Ok(project.to_string())
        }
    }

    fn summarize_project(dto: ProjectDto) -> ProjectSummary {
        ProjectSummary {
            id: dto.id,
            name: dto.name,
            path_with_namespace: dto.path_with_namespace,
            web_url: dto.web_url,
            description: dto.description.filter(|d| !d.trim().is_empty()),
            default_branch: dto.default_branch,
            visibility: dto.visibility,
            star_count: dto.star_count,
            forks_count: dto.forks_count,
            open_issues_count: dto.open_issues_count.unwrap_or(0),
            last_activity_at: dto.last_activity_at,
        }
    }
}
