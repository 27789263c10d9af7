use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use log::{info, warn};

use super::core::{project_context, GitLabProvider};
use crate::error::{GlInsightsError, Result};
use crate::insights::{ContributorReport, ContributorStat};
use crate::providers::gitlab::client::fetch_all;
use crate::providers::gitlab::types::{CommitDto, MergeRequestDto};
use crate::providers::gitlab::url_utils::project_endpoint;

impl GitLabProvider {
    pub async fn contributor_insights(
        &self,
        project: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        branch: Option<&str>,
    ) -> Result<ContributorReport> {
        if since > until {
            return Err(GlInsightsError::InvalidParameter(format!(
                "'since' ({}) is after 'until' ({})",
                since.to_rfc3339_opts(SecondsFormat::Secs, true),
                until.to_rfc3339_opts(SecondsFormat::Secs, true)
            )));
        }

        if since == until {
            info!("Empty contributor window for project: {project}");
            return Ok(Self::aggregate_contributors(project, since, until, &[], &[]));
        }

        info!("Collecting contributor activity for project: {project} ({since} .. {until})");

        let (commits, merge_requests) = tokio::try_join!(
            self.fetch_commits(project, since, until, branch),
            self.fetch_merged_merge_requests(project, since, branch),
        )?;

        if commits.is_empty() && merge_requests.is_empty() {
            warn!("No contributor activity found for project: {project}");
        }

        Ok(Self::aggregate_contributors(
            project,
            since,
            until,
            &commits,
            &merge_requests,
        ))
    }

    async fn fetch_commits(
        &self,
        project: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        branch: Option<&str>,
    ) -> Result<Vec<CommitDto>> {
        let mut query = vec![
            ("since", since.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("until", until.to_rfc3339_opts(SecondsFormat::Secs, true)),
        ];
        if let Some(branch) = branch {
            query.push(("ref_name", branch.to_string()));
        }

        fetch_all(
            self.api.as_ref(),
            &project_endpoint(project, "repository/commits"),
            &query,
            None,
        )
        .await
        .map_err(project_context(project))
    }

    async fn fetch_merged_merge_requests(
        &self,
        project: &str,
        since: DateTime<Utc>,
        branch: Option<&str>,
    ) -> Result<Vec<MergeRequestDto>> {
        let mut query = vec![
            ("state", "merged".to_string()),
            (
                "updated_after",
                since.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
        ];
        if let Some(branch) = branch {
            query.push(("target_branch", branch.to_string()));
        }

        fetch_all(
            self.api.as_ref(),
            &project_endpoint(project, "merge_requests"),
            &query,
            None,
        )
        .await
        .map_err(project_context(project))
    }

    fn aggregate_contributors(
        project: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        commits: &[CommitDto],
        merge_requests: &[MergeRequestDto],
    ) -> ContributorReport {
        let mut stats: HashMap<String, ContributorStat> = HashMap::new();

        for commit in commits {
            stats.entry(commit.author_name.clone()).or_default().commits += 1;
        }

        // updated_after also returns MRs merged before the window
        let merged_in_window = merge_requests.iter().filter(|mr| {
            mr.merged_at
                .is_some_and(|merged_at| merged_at >= since && merged_at <= until)
        });

        let mut total_merged_merge_requests = 0;
        for mr in merged_in_window {
            let author = mr
                .author
                .as_ref()
                .map_or("unknown", |author| author.display_name());
            stats.entry(author.to_string()).or_default().merged_merge_requests += 1;
            total_merged_merge_requests += 1;
        }

        let mut sorted: Vec<_> = stats.into_iter().collect();
        sorted.sort_by(|a, b| {
            b.1.commits
                .cmp(&a.1.commits)
                .then_with(|| a.0.cmp(&b.0))
        });

        ContributorReport {
            project: project.to_string(),
            since,
            until,
            total_commits: commits.len(),
            total_merged_merge_requests,
            contributors: sorted.into_iter().collect::<IndexMap<_, _>>(),
        }
    }
}
