use std::collections::HashMap;

use chrono::{Duration, SecondsFormat, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::core::{mean, percentage, project_context, rank_counts, GitLabProvider, MAX_ANALYZED_ITEMS};
use crate::error::Result;
use crate::insights::MergeRequestReport;
use crate::providers::gitlab::client::fetch_all;
use crate::providers::gitlab::types::MergeRequestDto;
use crate::providers::gitlab::url_utils::project_endpoint;

const REVIEW_HOURS_WARNING: f64 = 48.0;
const OPEN_MERGE_REQUESTS_WARNING: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Week,
    #[default]
    Month,
    Quarter,
}

impl Timeframe {
    pub fn days(self) -> i64 {
        match self {
            Self::Week => 7,
            Self::Month => 30,
            Self::Quarter => 90,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::Quarter => "quarter",
        }
    }
}

impl GitLabProvider {
    pub async fn merge_request_analysis(
        &self,
        project: &str,
        timeframe: Timeframe,
    ) -> Result<MergeRequestReport> {
        info!(
            "Analyzing merge requests for project: {project} (last {} days)",
            timeframe.days()
        );

        let created_after = Utc::now() - Duration::days(timeframe.days());
        let query = [
            ("scope", "all".to_string()),
            (
                "created_after",
                created_after.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
        ];

        let merge_requests: Vec<MergeRequestDto> = fetch_all(
            self.api.as_ref(),
            &project_endpoint(project, "merge_requests"),
            &query,
            Some(MAX_ANALYZED_ITEMS),
        )
        .await
        .map_err(project_context(project))?;

        if merge_requests.is_empty() {
            warn!("No merge requests in the last {} days for project: {project}", timeframe.days());
        }

        Ok(Self::summarize_merge_requests(project, timeframe, &merge_requests))
    }

    fn summarize_merge_requests(
        project: &str,
        timeframe: Timeframe,
        merge_requests: &[MergeRequestDto],
    ) -> MergeRequestReport {
        let count_state = |state: &str| merge_requests.iter().filter(|mr| mr.state == state).count();
        let opened = count_state("opened");
        let merged = count_state("merged");
        let closed = count_state("closed");

        #[allow(clippy::cast_precision_loss)]
        let review_hours: Vec<f64> = merge_requests
            .iter()
            .filter(|mr| mr.state == "merged")
            .filter_map(|mr| mr.merged_at.map(|merged_at| merged_at - mr.created_at))
            .map(|elapsed| elapsed.num_seconds() as f64 / 3600.0)
            .collect();
        let avg_review_hours = mean(&review_hours);

        let mut authors: HashMap<String, usize> = HashMap::new();
        for mr in merge_requests {
            let author = mr
                .author
                .as_ref()
                .map_or_else(|| "unknown".to_string(), |a| a.username.clone());
            *authors.entry(author).or_insert(0) += 1;
        }

        let mut recommendations = Vec::new();
        if avg_review_hours > REVIEW_HOURS_WARNING {
            recommendations.push(format!(
                "Average review time is {avg_review_hours:.1}h (over {REVIEW_HOURS_WARNING}h); consider smaller merge requests or dedicated review slots"
            ));
        }
        if opened > OPEN_MERGE_REQUESTS_WARNING {
            recommendations.push(format!(
                "{opened} merge requests are still open; schedule a review day to reduce the backlog"
            ));
        }

        MergeRequestReport {
            project: project.to_string(),
            timeframe: timeframe.as_str().to_string(),
            days: timeframe.days(),
            total: merge_requests.len(),
            opened,
            merged,
            closed,
            merge_rate: percentage(merged, opened + merged),
            avg_review_hours,
            top_authors: rank_counts(authors, 5),
            recommendations,
        }
    }
}
