use chrono::NaiveDate;
use log::info;
use serde::de::IgnoredAny;

use super::core::{mean, percentage, project_context, GitLabProvider, MAX_ANALYZED_ITEMS};
use crate::error::{GlInsightsError, Result};
use crate::insights::{DoraLevel, DoraReport};
use crate::providers::gitlab::client::fetch_all;
use crate::providers::gitlab::types::{DeploymentDto, IssueDto, MergeRequestDto};
use crate::providers::gitlab::url_utils::project_endpoint;

/// Lead time is averaged over the most recent merges only.
const LEAD_TIME_SAMPLE: usize = 50;
const HIGH_LEAD_TIME_DAYS: f64 = 7.0;
const LOW_CHANGE_FAILURE_RATE: f64 = 15.0;

impl GitLabProvider {
    pub async fn dora_metrics(
        &self,
        project: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DoraReport> {
        if start > end {
            return Err(GlInsightsError::InvalidParameter(format!(
                "'start_date' ({start}) is after 'end_date' ({end})"
            )));
        }

        info!("Computing DORA metrics for project: {project} ({start} .. {end})");

        let api = self.api.as_ref();
        let (start_s, end_s) = (start.to_string(), end.to_string());

        let releases_path = project_endpoint(project, "releases");
        let deployments_path = project_endpoint(project, "deployments");
        let merge_requests_path = project_endpoint(project, "merge_requests");
        let issues_path = project_endpoint(project, "issues");

        let deployment_query = [
            ("updated_after", start_s.clone()),
            ("updated_before", end_s.clone()),
            // GitLab only accepts the updated_* filters with this ordering
            ("order_by", "updated_at".to_string()),
        ];
        let merge_request_query = [
            ("state", "merged".to_string()),
            ("updated_after", start_s.clone()),
            ("updated_before", end_s),
        ];
        let incident_query = [
            ("state", "closed".to_string()),
            ("labels", "incident".to_string()),
            ("created_after", start_s),
        ];

        let (releases, deployments, merge_requests, incidents) = tokio::try_join!(
            fetch_all::<IgnoredAny>(api, &releases_path, &[], Some(MAX_ANALYZED_ITEMS)),
            fetch_all::<DeploymentDto>(api, &deployments_path, &deployment_query, Some(MAX_ANALYZED_ITEMS)),
            fetch_all::<MergeRequestDto>(api, &merge_requests_path, &merge_request_query, Some(MAX_ANALYZED_ITEMS)),
            fetch_all::<IssueDto>(api, &issues_path, &incident_query, Some(MAX_ANALYZED_ITEMS)),
        )
        .map_err(project_context(project))?;

        Ok(Self::summarize_dora(
            project,
            (start, end),
            &releases,
            &deployments,
            &merge_requests,
            &incidents,
        ))
    }

    fn summarize_dora(
        project: &str,
        (start, end): (NaiveDate, NaiveDate),
        releases: &[IgnoredAny],
        deployments: &[DeploymentDto],
        merge_requests: &[MergeRequestDto],
        incidents: &[IssueDto],
    ) -> DoraReport {
        let period_days = (end - start).num_days();

        #[allow(clippy::cast_precision_loss)]
        let deployment_frequency_per_day = deployments.len() as f64 / period_days.max(1) as f64;

        // Whole days, matching how GitLab reports lead time
        #[allow(clippy::cast_precision_loss)]
        let lead_times: Vec<f64> = merge_requests
            .iter()
            .take(LEAD_TIME_SAMPLE)
            .filter_map(|mr| mr.merged_at.map(|merged_at| (merged_at - mr.created_at).num_days() as f64))
            .collect();
        let lead_time_days = mean(&lead_times);

        #[allow(clippy::cast_precision_loss)]
        let restore_hours: Vec<f64> = incidents
            .iter()
            .filter_map(|i| i.closed_at.map(|closed_at| (closed_at - i.created_at).num_seconds() as f64 / 3600.0))
            .collect();
        let time_to_restore_hours = mean(&restore_hours);

        let failed_deployments = deployments.iter().filter(|d| d.status == "failed").count();
        let change_failure_rate = percentage(failed_deployments, deployments.len());

        DoraReport {
            project: project.to_string(),
            start_date: start,
            end_date: end,
            period_days,
            deployment_frequency_per_day,
            lead_time_days,
            time_to_restore_hours,
            change_failure_rate,
            level: dora_level(deployment_frequency_per_day, lead_time_days, change_failure_rate),
            deployments: deployments.len(),
            failed_deployments,
            releases: releases.len(),
            merged_merge_requests: merge_requests.len(),
            incidents: incidents.len(),
        }
    }
}

fn dora_level(deployments_per_day: f64, lead_time_days: f64, change_failure_rate: f64) -> DoraLevel {
    if change_failure_rate > LOW_CHANGE_FAILURE_RATE {
        DoraLevel::Low
    } else if deployments_per_day >= 1.0 {
        DoraLevel::Elite
    } else if lead_time_days < HIGH_LEAD_TIME_DAYS {
        DoraLevel::High
    } else {
        DoraLevel::Medium
    }
}
