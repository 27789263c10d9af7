use chrono::{DateTime, Utc};
use log::info;

use super::core::{project_context, unavailable_as_empty, GitLabProvider, MAX_ANALYZED_ITEMS};
use crate::error::Result;
use crate::insights::{HealthDeduction, HealthReport, HealthStatus};
use crate::providers::gitlab::client::fetch_all;
use crate::providers::gitlab::types::{IssueDto, MergeRequestDto, PipelineListDto, ProjectDto};
use crate::providers::gitlab::url_utils::project_endpoint;

const INACTIVE_DAYS: i64 = 30;
const MAX_OPEN_MERGE_REQUESTS: usize = 15;
const MAX_OPEN_ISSUES: usize = 50;

impl GitLabProvider {
    pub async fn project_health(&self, project: &str) -> Result<HealthReport> {
        info!("Building health report for project: {project}");

        let api = self.api.as_ref();
        let opened = [("state", "opened".to_string())];
        let merge_requests_path = project_endpoint(project, "merge_requests");
        let issues_path = project_endpoint(project, "issues");
        let pipelines_path = project_endpoint(project, "pipelines");

        // Features disabled on the project answer 403 or 404; they count as empty
        let (dto, open_merge_requests, open_issues, latest_pipeline) = tokio::try_join!(
            self.fetch_project(project),
            async {
                let result = fetch_all::<MergeRequestDto>(
                    api,
                    &merge_requests_path,
                    &opened,
                    Some(MAX_ANALYZED_ITEMS),
                )
                .await;
                unavailable_as_empty(result, "merge requests", project)
            },
            async {
                let result =
                    fetch_all::<IssueDto>(api, &issues_path, &opened, Some(MAX_ANALYZED_ITEMS))
                        .await;
                unavailable_as_empty(result, "issues", project)
            },
            async {
                let result = fetch_all::<PipelineListDto>(api, &pipelines_path, &[], Some(1)).await;
                unavailable_as_empty(result, "pipelines", project)
            },
        )
        .map_err(project_context(project))?;

        Ok(Self::summarize_health(
            project,
            &dto,
            open_merge_requests.len(),
            open_issues.len(),
            latest_pipeline.first(),
            Utc::now(),
        ))
    }

    fn summarize_health(
        project: &str,
        dto: &ProjectDto,
        open_merge_requests: usize,
        open_issues: usize,
        latest_pipeline: Option<&PipelineListDto>,
        now: DateTime<Utc>,
    ) -> HealthReport {
        let days_since_activity = dto.last_activity_at.map(|at| (now - at).num_days());
        let mut deductions = Vec::new();

        if days_since_activity.is_some_and(|days| days > INACTIVE_DAYS) {
            deductions.push(HealthDeduction {
                reason: format!("No activity for more than {INACTIVE_DAYS} days"),
                points: 30,
            });
        }
        if open_merge_requests > MAX_OPEN_MERGE_REQUESTS {
            deductions.push(HealthDeduction {
                reason: format!("More than {MAX_OPEN_MERGE_REQUESTS} open merge requests"),
                points: 20,
            });
        }
        if open_issues > MAX_OPEN_ISSUES {
            deductions.push(HealthDeduction {
                reason: format!("More than {MAX_OPEN_ISSUES} open issues"),
                points: 25,
            });
        }
        if latest_pipeline.is_some_and(|p| p.status == "failed") {
            deductions.push(HealthDeduction {
                reason: "Latest pipeline failed".to_string(),
                points: 15,
            });
        }

        let score = 100u32.saturating_sub(deductions.iter().map(|d| d.points).sum());
        let status = match score {
            80.. => HealthStatus::Healthy,
            60..=79 => HealthStatus::NeedsAttention,
            _ => HealthStatus::Critical,
        };

        HealthReport {
            project: project.to_string(),
            name: dto.name.clone(),
            days_since_activity,
            open_merge_requests,
            open_issues,
            latest_pipeline_status: latest_pipeline.map(|p| format!("{} (#{})", p.status, p.id)),
            score,
            status,
            deductions,
        }
    }
}
