mod definitions;
mod params;

use std::sync::Arc;

use chrono::Utc;
use log::info;
use serde::Serialize;
use serde_json::Value;

pub use definitions::ToolDefinition;
use params::{
    parse_args, ActivityParams, ContributorParams, DependencyParams, DoraParams, GroupParams,
    IssueParams, MergeRequestParams, PipelineHealthParams, ProjectParams, ReadReadmeParams,
    ReadmeParams, SearchReadmeParams,
};

use crate::error::{GlInsightsError, Result};
use crate::providers::gitlab::GitLabProvider;

/// Routes tool invocations to the provider. Holds no per-call state.
pub struct ToolDispatcher {
    provider: Arc<GitLabProvider>,
    default_project: Option<String>,
}

impl ToolDispatcher {
    pub fn new(provider: Arc<GitLabProvider>, default_project: Option<String>) -> Self {
        Self {
            provider,
            default_project,
        }
    }

    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        tool_definitions()
    }

    pub async fn call(&self, name: &str, args: Value) -> Result<Value> {
        info!("Calling tool: {name}");

        match name {
            "project_overview" => {
                let params: ProjectParams = parse_args(args)?;
                let project = self.project(params.project)?;
                to_value(self.provider.project_overview(&project).await?)
            }
            "pipeline_health" => {
                let params: PipelineHealthParams = parse_args(args)?;
                let limit = params.limit()?;
                let project = self.project(params.project)?;
                to_value(
                    self.provider
                        .pipeline_health(&project, limit, params.ref_.as_deref())
                        .await?,
                )
            }
            "contributor_insights" => {
                let params: ContributorParams = parse_args(args)?;
                let (since, until) = params.window(Utc::now())?;
                let project = self.project(params.project)?;
                to_value(
                    self.provider
                        .contributor_insights(&project, since, until, params.ref_.as_deref())
                        .await?,
                )
            }
            "dependency_check" => {
                let params: DependencyParams = parse_args(args)?;
                let project = self.project(params.project)?;
                to_value(
                    self.provider
                        .dependency_check(
                            &project,
                            params.manifest_path.as_deref(),
                            params.ref_.as_deref(),
                        )
                        .await?,
                )
            }
            "merge_request_analysis" => {
                let params: MergeRequestParams = parse_args(args)?;
                let project = self.project(params.project)?;
                to_value(
                    self.provider
                        .merge_request_analysis(&project, params.timeframe)
                        .await?,
                )
            }
            "issue_analysis" => {
                let params: IssueParams = parse_args(args)?;
                let project = self.project(params.project)?;
                to_value(
                    self.provider
                        .issue_analysis(&project, params.label.as_deref())
                        .await?,
                )
            }
            "dora_metrics" => {
                let params: DoraParams = parse_args(args)?;
                let (start, end) = params.range(Utc::now().date_naive())?;
                let project = self.project(params.project)?;
                to_value(self.provider.dora_metrics(&project, start, end).await?)
            }
            "project_health" => {
                let params: ProjectParams = parse_args(args)?;
                let project = self.project(params.project)?;
                to_value(self.provider.project_health(&project).await?)
            }
            "project_activity" => {
                let params: ActivityParams = parse_args(args)?;
                let days = params.days()?;
                let project = self.project(params.project)?;
                to_value(self.provider.project_activity(&project, days).await?)
            }
            "group_projects" => {
                let params: GroupParams = parse_args(args)?;
                to_value(
                    self.provider
                        .group_projects(params.group()?, params.with_metrics)
                        .await?,
                )
            }
            "read_readme" => {
                let params: ReadReadmeParams = parse_args(args)?;
                let max_chars = params.max_chars()?;
                let project = self.project(params.project)?;
                to_value(
                    self.provider
                        .read_readme(&project, params.ref_.as_deref(), Some(max_chars))
                        .await?,
                )
            }
            "readme_files" => {
                let params: ReadmeParams = parse_args(args)?;
                let project = self.project(params.project)?;
                to_value(
                    self.provider
                        .readme_files(&project, params.ref_.as_deref())
                        .await?,
                )
            }
            "readme_stats" => {
                let params: ReadmeParams = parse_args(args)?;
                let project = self.project(params.project)?;
                to_value(
                    self.provider
                        .readme_stats(&project, params.ref_.as_deref())
                        .await?,
                )
            }
            "search_readme" => {
                let params: SearchReadmeParams = parse_args(args)?;
                let project = self.project(params.project)?;
                to_value(
                    self.provider
                        .search_readme(
                            &project,
                            &params.term,
                            params.ref_.as_deref(),
                            params.case_sensitive,
                        )
                        .await?,
                )
            }
            "readme_quality" => {
                let params: ReadmeParams = parse_args(args)?;
                let project = self.project(params.project)?;
                to_value(
                    self.provider
                        .readme_quality(&project, params.ref_.as_deref())
                        .await?,
                )
            }
            _ => Err(GlInsightsError::UnknownTool(name.to_string())),
        }
    }

    fn project(&self, requested: Option<String>) -> Result<String> {
        requested
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .or_else(|| self.default_project.clone())
            .ok_or_else(|| {
                GlInsightsError::InvalidParameter(
                    "'project' is required when no default project is configured".to_string(),
                )
            })
    }
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    definitions::all()
}

fn to_value<T: Serialize>(result: T) -> Result<Value> {
    Ok(serde_json::to_value(result)?)
}
