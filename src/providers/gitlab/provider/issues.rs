use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::{info, warn};

use super::core::{project_context, rank_counts, GitLabProvider, MAX_ANALYZED_ITEMS};
use crate::error::Result;
use crate::insights::{CriticalIssue, IssueAgeBuckets, IssueReport};
use crate::providers::gitlab::client::fetch_all;
use crate::providers::gitlab::types::IssueDto;
use crate::providers::gitlab::url_utils::project_endpoint;

const CRITICAL_LABELS: [&str; 2] = ["critical", "severity::1"];
const MAX_CRITICAL_ISSUES: usize = 3;

impl GitLabProvider {
    pub async fn issue_analysis(&self, project: &str, label: Option<&str>) -> Result<IssueReport> {
        info!("Analyzing issues for project: {project}");

        let mut query = vec![("scope", "all".to_string())];
        if let Some(label) = label {
            query.push(("labels", label.to_string()));
        }

        let issues: Vec<IssueDto> = fetch_all(
            self.api.as_ref(),
            &project_endpoint(project, "issues"),
            &query,
            Some(MAX_ANALYZED_ITEMS),
        )
        .await
        .map_err(project_context(project))?;

        if issues.is_empty() {
            warn!("No issues found for project: {project}");
        }

        Ok(Self::summarize_issues(project, label, &issues, Utc::now()))
    }

    fn summarize_issues(
        project: &str,
        label: Option<&str>,
        issues: &[IssueDto],
        now: DateTime<Utc>,
    ) -> IssueReport {
        let mut label_counts: HashMap<String, usize> = HashMap::new();
        let mut assignee_counts: HashMap<String, usize> = HashMap::new();
        let mut open_issue_age = IssueAgeBuckets::default();
        let mut critical_issues = Vec::new();

        for issue in issues {
            for issue_label in &issue.labels {
                *label_counts.entry(issue_label.clone()).or_insert(0) += 1;
            }
            if let Some(assignee) = &issue.assignee {
                *assignee_counts.entry(assignee.username.clone()).or_insert(0) += 1;
            }

            if issue.state != "opened" {
                continue;
            }

            match (now - issue.created_at).num_days() {
                age if age < 1 => open_issue_age.under_one_day += 1,
                age if age <= 7 => open_issue_age.one_to_seven_days += 1,
                age if age <= 30 => open_issue_age.one_to_four_weeks += 1,
                _ => open_issue_age.over_one_month += 1,
            }

            let is_critical = issue
                .labels
                .iter()
                .any(|l| CRITICAL_LABELS.contains(&l.as_str()));
            if is_critical && critical_issues.len() < MAX_CRITICAL_ISSUES {
                critical_issues.push(CriticalIssue {
                    iid: issue.iid,
                    title: issue.title.clone(),
                    created_at: issue.created_at,
                });
            }
        }

        IssueReport {
            project: project.to_string(),
            label: label.map(ToString::to_string),
            total: issues.len(),
            opened: issues.iter().filter(|i| i.state == "opened").count(),
            closed: issues.iter().filter(|i| i.state == "closed").count(),
            locked: issues
                .iter()
                .filter(|i| i.discussion_locked == Some(true))
                .count(),
            open_issue_age,
            top_labels: rank_counts(label_counts, 5),
            top_assignees: rank_counts(assignee_counts, 5),
            critical_issues,
        }
    }
}
