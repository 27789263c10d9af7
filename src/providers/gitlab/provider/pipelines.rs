use std::collections::HashMap;

use chrono::Utc;
use indexmap::IndexMap;
use log::{info, warn};

use super::core::{mean, percentage, GitLabProvider};
use crate::error::Result;
use crate::insights::{PipelineReport, PipelineRun};
use crate::providers::gitlab::client::graphql::{self, PipelineNode};
use crate::providers::gitlab::url_utils::{extract_numeric_id, pipeline_id_to_url};

impl GitLabProvider {
    pub async fn pipeline_health(
        &self,
        project: &str,
        limit: usize,
        branch: Option<&str>,
    ) -> Result<PipelineReport> {
        info!("Fetching up to {limit} pipelines for project: {project}");

        let project_path = self.resolve_project_path(project).await?;
        let nodes = graphql::fetch_pipelines(self.api.as_ref(), &project_path, limit, branch).await?;

        if nodes.is_empty() {
            warn!("No pipelines found for project: {project_path}");
        }

        let runs = Self::to_runs(self.api.web_url(), &project_path, nodes);
        Ok(Self::build_pipeline_report(&project_path, runs))
    }

    fn to_runs(web_url: &str, project_path: &str, nodes: Vec<PipelineNode>) -> Vec<PipelineRun> {
        nodes
            .into_iter()
            .filter_map(|node| {
                let Some(id) = extract_numeric_id(&node.id) else {
                    warn!("Skipping pipeline with unexpected id: {}", node.id);
                    return None;
                };

                Some(PipelineRun {
                    id,
                    status: node.status.to_lowercase(),
                    ref_: node.ref_,
                    created_at: node.created_at,
                    duration_seconds: node.duration,
                    web_url: pipeline_id_to_url(web_url, project_path, id),
                })
            })
            .collect()
    }

    fn build_pipeline_report(project_path: &str, mut runs: Vec<PipelineRun>) -> PipelineReport {
        // Stable sort: runs sharing a timestamp keep GitLab's order
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total_pipelines = runs.len();
        let successful_pipelines = runs.iter().filter(|p| p.status == "success").count();
        let failed_pipelines = runs.iter().filter(|p| p.status == "failed").count();

        #[allow(clippy::cast_precision_loss)]
        let durations: Vec<f64> = runs
            .iter()
            .filter_map(|p| p.duration_seconds)
            .map(|d| d as f64)
            .collect();

        PipelineReport {
            project: project_path.to_string(),
            collected_at: Utc::now(),
            total_pipelines,
            successful_pipelines,
            failed_pipelines,
            success_rate: percentage(successful_pipelines, total_pipelines),
            avg_duration_seconds: mean(&durations),
            status_counts: Self::count_statuses(&runs),
            pipelines: runs,
        }
    }

    fn count_statuses(runs: &[PipelineRun]) -> IndexMap<String, usize> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for run in runs {
            *counts.entry(run.status.as_str()).or_insert(0) += 1;
        }

        let mut sorted: Vec<_> = counts.into_iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        sorted
            .into_iter()
            .map(|(status, count)| (status.to_string(), count))
            .collect()
    }
}
