use async_trait::async_trait;
use graphql_client::QueryBody;
use serde_json::Value;

use super::core::GitLabClient;
use super::pagination::{next_page_from_headers, Page};
use crate::error::{GlInsightsError, Result};

/// Read-only access to a GitLab instance. Paths are relative to `/api/v4/`.
#[async_trait]
pub trait GitLabApi: Send + Sync {
    /// Web root of the instance, used to build links to pipelines.
    fn web_url(&self) -> &str;

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value>;

    async fn get_page(
        &self,
        path: &str,
        query: &[(&str, String)],
        page: u32,
        per_page: u32,
    ) -> Result<Page>;

    /// Raw content of a repository file.
    async fn get_file(&self, project: &str, file_path: &str, ref_: Option<&str>)
        -> Result<String>;

    /// Executes a GraphQL query and returns its `data` member.
    async fn graphql(
        &self,
        query: &'static str,
        operation_name: &'static str,
        variables: Value,
    ) -> Result<Value>;
}

#[async_trait]
impl GitLabApi for GitLabClient {
    fn web_url(&self) -> &str {
        &self.web_url
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = self.endpoint_url(path)?;
        let response = self
            .execute(|| self.client.get(url.clone()).query(query))
            .await?;

        Ok(response.json::<Value>().await?)
    }

    async fn get_page(
        &self,
        path: &str,
        query: &[(&str, String)],
        page: u32,
        per_page: u32,
    ) -> Result<Page> {
        let url = self.endpoint_url(path)?;
        let response = self
            .execute(|| {
                self.client
                    .get(url.clone())
                    .query(query)
                    .query(&[("page", page), ("per_page", per_page)])
            })
            .await?;

        let next_page = next_page_from_headers(response.headers());
        let items = match response.json::<Value>().await? {
            Value::Array(items) => items,
            other => {
                return Err(GlInsightsError::Api {
                    status: 200,
                    message: format!("{path}: expected a JSON array, got {}", json_type(&other)),
                })
            }
        };

        Ok(Page { items, next_page })
    }

    async fn get_file(
        &self,
        project: &str,
        file_path: &str,
        ref_: Option<&str>,
    ) -> Result<String> {
        let path = format!(
            "projects/{}/repository/files/{}/raw",
            urlencoding::encode(project),
            urlencoding::encode(file_path)
        );
        let url = self.endpoint_url(&path)?;
        let response = self
            .execute(|| {
                let request = self.client.get(url.clone());
                match ref_ {
                    Some(ref_) => request.query(&[("ref", ref_)]),
                    None => request,
                }
            })
            .await?;

        Ok(response.text().await?)
    }

    async fn graphql(
        &self,
        query: &'static str,
        operation_name: &'static str,
        variables: Value,
    ) -> Result<Value> {
        let body = QueryBody {
            variables,
            query,
            operation_name,
        };
        let response = self
            .execute(|| self.client.post(self.graphql_url.clone()).json(&body))
            .await?;

        let response_body: graphql_client::Response<Value> = response.json().await?;

        if let Some(errors) = response_body.errors.filter(|e| !e.is_empty()) {
            let error_messages: Vec<String> = errors.iter().map(|e| e.message.clone()).collect();
            let joined_errors = error_messages.join(", ");
            return Err(GlInsightsError::Api {
                status: 200,
                message: format!("GraphQL errors: {joined_errors}"),
            });
        }

        response_body.data.ok_or_else(|| GlInsightsError::Api {
            status: 200,
            message: "GraphQL response contained no data".to_string(),
        })
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
