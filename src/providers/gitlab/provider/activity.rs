use std::collections::HashMap;

use chrono::{Duration, NaiveDate, Utc};
use indexmap::IndexMap;
use log::{info, warn};

use super::core::{percentage, project_context, GitLabProvider, MAX_ANALYZED_ITEMS};
use crate::error::Result;
use crate::insights::{ActivityReport, KeyEvent, Share};
use crate::providers::gitlab::client::fetch_all;
use crate::providers::gitlab::types::EventDto;
use crate::providers::gitlab::url_utils::project_endpoint;

/// Event actions worth surfacing individually. GitLab reports merges as `accepted`.
const KEY_ACTIONS: [&str; 7] = [
    "pushed to",
    "pushed new",
    "merged",
    "accepted",
    "created",
    "closed",
    "commented on",
];
const MAX_KEY_EVENTS: usize = 5;

impl GitLabProvider {
    pub async fn project_activity(&self, project: &str, days: i64) -> Result<ActivityReport> {
        info!("Collecting activity for project: {project} (last {days} days)");

        let today = Utc::now().date_naive();
        let since = today - Duration::days(days);
        let query = [("after", since.format("%Y-%m-%d").to_string())];
        let events_path = project_endpoint(project, "events");

        let (dto, events) = tokio::try_join!(
            self.fetch_project(project),
            fetch_all::<EventDto>(
                self.api.as_ref(),
                &events_path,
                &query,
                Some(MAX_ANALYZED_ITEMS)
            ),
        )
        .map_err(project_context(project))?;

        if events.is_empty() {
            warn!("No events found for project: {project}");
        }

        Ok(Self::summarize_activity(
            project,
            &dto.name,
            (since, today),
            days,
            &events,
        ))
    }

    /// `events` arrive newest first, as GitLab returns them.
    fn summarize_activity(
        project: &str,
        name: &str,
        (since, until): (NaiveDate, NaiveDate),
        days: i64,
        events: &[EventDto],
    ) -> ActivityReport {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for event in events {
            *counts.entry(event.action_name.as_str()).or_insert(0) += 1;
        }

        let mut ranked: Vec<_> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let actions: IndexMap<String, Share> = ranked
            .into_iter()
            .map(|(action, count)| {
                let share = Share {
                    count,
                    percentage: percentage(count, events.len()),
                };
                (action.to_string(), share)
            })
            .collect();

        let recent_key_events = events
            .iter()
            .filter(|event| KEY_ACTIONS.contains(&event.action_name.as_str()))
            .take(MAX_KEY_EVENTS)
            .map(|event| KeyEvent {
                author: event.username().to_string(),
                action: event.action_name.clone(),
                target_type: event.target_type.clone(),
                target_title: event.target_title.clone(),
                created_at: event.created_at,
            })
            .collect();

        ActivityReport {
            project: project.to_string(),
            name: name.to_string(),
            since,
            until,
            days,
            total_events: events.len(),
            actions,
            recent_key_events,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{json, Value};

    use super::*;
    use crate::providers::gitlab::client::testing::MockGitLab;
    use crate::providers::registry::testing::StaticRegistry;

    const EVENTS: &str = "projects/group%2Fapp/events";

    fn event(action: &str, username: &str, created_at: &str) -> Value {
        json!({
            "action_name": action,
            "author": { "username": username, "name": username },
            "author_username": username,
            "target_type": null,
            "target_title": null,
            "created_at": created_at
        })
    }

    fn project_document() -> Value {
        json!({
            "id": 1,
            "name": "app",
            "path_with_namespace": "group/app",
            "web_url": "https://gitlab.example.com/group/app"
        })
    }

    fn events(values: Vec<Value>) -> Vec<EventDto> {
        values
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect()
    }

    fn window() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2024, 5, 25).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        )
    }

    #[test]
    fn test_actions_ranked_with_shares() {
        let events = events(vec![
            event("pushed to", "alice", "2024-05-31T10:00:00Z"),
            event("joined", "dave", "2024-05-30T10:00:00Z"),
            event("commented on", "bob", "2024-05-29T10:00:00Z"),
            event("pushed to", "alice", "2024-05-28T10:00:00Z"),
        ]);

        let report = GitLabProvider::summarize_activity("group/app", "app", window(), 7, &events);

        assert_eq!(report.total_events, 4);
        let actions: Vec<_> = report.actions.keys().map(String::as_str).collect();
        assert_eq!(actions, vec!["pushed to", "commented on", "joined"]);
        assert_eq!(
            report.actions["pushed to"],
            Share {
                count: 2,
                percentage: 50.0
            }
        );
        assert!((report.actions["joined"].percentage - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_key_events_keep_newest_five() {
        let events = events(vec![
            event("joined", "dave", "2024-05-31T12:00:00Z"),
            event("pushed to", "alice", "2024-05-31T11:00:00Z"),
            event("accepted", "bob", "2024-05-31T10:00:00Z"),
            event("commented on", "carol", "2024-05-31T09:00:00Z"),
            event("closed", "bob", "2024-05-31T08:00:00Z"),
            event("created", "alice", "2024-05-31T07:00:00Z"),
            event("pushed to", "alice", "2024-05-31T06:00:00Z"),
        ]);

        let report = GitLabProvider::summarize_activity("group/app", "app", window(), 7, &events);

        let key: Vec<_> = report
            .recent_key_events
            .iter()
            .map(|e| (e.author.as_str(), e.action.as_str()))
            .collect();
        assert_eq!(
            key,
            vec![
                ("alice", "pushed to"),
                ("bob", "accepted"),
                ("carol", "commented on"),
                ("bob", "closed"),
                ("alice", "created"),
            ]
        );
    }

    #[test]
    fn test_author_falls_back_to_username_field() {
        let events = events(vec![json!({
            "action_name": "pushed to",
            "author_username": "ci-bot",
            "created_at": "2024-05-31T10:00:00Z"
        })]);

        let report = GitLabProvider::summarize_activity("group/app", "app", window(), 7, &events);

        assert_eq!(report.recent_key_events[0].author, "ci-bot");
    }

    #[tokio::test]
    async fn test_project_activity_queries_window_start() {
        let api = Arc::new(
            MockGitLab::new()
                .with_document("projects/group%2Fapp", project_document())
                .with_pages(
                    EVENTS,
                    vec![vec![event("pushed to", "alice", "2024-05-31T10:00:00Z")]],
                ),
        );
        let provider = GitLabProvider::new(api.clone(), Arc::new(StaticRegistry::default()));

        let report = provider.project_activity("group/app", 7).await.unwrap();

        assert_eq!(report.name, "app");
        assert_eq!(report.total_events, 1);
        assert_eq!(report.until - report.since, Duration::days(7));
        let expected_after = report.since.format("%Y-%m-%d").to_string();
        assert_eq!(
            api.first_query(EVENTS),
            vec![("after".to_string(), expected_after)]
        );
    }

    #[tokio::test]
    async fn test_quiet_project_has_empty_breakdown() {
        let api = MockGitLab::new()
            .with_document("projects/group%2Fapp", project_document())
            .with_pages(EVENTS, vec![vec![]]);
        let provider = GitLabProvider::new(Arc::new(api), Arc::new(StaticRegistry::default()));

        let report = provider.project_activity("group/app", 30).await.unwrap();

        assert_eq!(report.total_events, 0);
        assert!(report.actions.is_empty());
        assert!(report.recent_key_events.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_project_is_not_found() {
        let provider = GitLabProvider::new(
            Arc::new(MockGitLab::new()),
            Arc::new(StaticRegistry::default()),
        );

        let err = provider.project_activity("group/missing", 7).await.unwrap_err();

        assert_eq!(err.kind(), "not_found");
        assert!(err.to_string().contains("group/missing"));
    }
}
