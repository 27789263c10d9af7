//! In-memory `GitLabApi` used by aggregator tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::api::GitLabApi;
use super::pagination::Page;
use crate::error::{GlInsightsError, Result};

type ErrorFactory = Box<dyn Fn() -> GlInsightsError + Send + Sync>;

#[derive(Default)]
pub struct MockGitLab {
    documents: HashMap<String, Value>,
    pages: HashMap<String, Vec<Vec<Value>>>,
    files: HashMap<String, String>,
    errors: HashMap<String, ErrorFactory>,
    graphql_responses: Mutex<VecDeque<Value>>,
    graphql_calls: Mutex<Vec<Value>>,
    page_requests: Mutex<Vec<(String, u32, Vec<(String, String)>)>>,
}

impl MockGitLab {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, path: &str, value: Value) -> Self {
        self.documents.insert(path.to_string(), value);
        self
    }

    pub fn with_pages(mut self, path: &str, pages: Vec<Vec<Value>>) -> Self {
        self.pages.insert(path.to_string(), pages);
        self
    }

    pub fn with_file(mut self, file_path: &str, content: &str) -> Self {
        self.files.insert(file_path.to_string(), content.to_string());
        self
    }

    pub fn with_error<F>(mut self, path: &str, error: F) -> Self
    where
        F: Fn() -> GlInsightsError + Send + Sync + 'static,
    {
        self.errors.insert(path.to_string(), Box::new(error));
        self
    }

    pub fn with_graphql(self, data: Value) -> Self {
        self.graphql_responses
            .lock()
            .expect("graphql queue poisoned")
            .push_back(data);
        self
    }

    pub fn graphql_calls(&self) -> Vec<Value> {
        self.graphql_calls
            .lock()
            .expect("graphql calls poisoned")
            .clone()
    }

    /// Page numbers requested for `path`, in request order.
    pub fn page_requests(&self, path: &str) -> Vec<u32> {
        self.page_requests
            .lock()
            .expect("page requests poisoned")
            .iter()
            .filter(|(p, _, _)| p == path)
            .map(|(_, page, _)| *page)
            .collect()
    }

    /// Query parameters of the first request made for `path`.
    pub fn first_query(&self, path: &str) -> Vec<(String, String)> {
        self.page_requests
            .lock()
            .expect("page requests poisoned")
            .iter()
            .find(|(p, _, _)| p == path)
            .map(|(_, _, query)| query.clone())
            .unwrap_or_default()
    }

    fn check_error(&self, path: &str) -> Result<()> {
        match self.errors.get(path) {
            Some(error) => Err(error()),
            None => Ok(()),
        }
    }
}

fn not_found(path: &str) -> GlInsightsError {
    GlInsightsError::NotFound(format!("/api/v4/{path}: 404 Not Found"))
}

#[async_trait]
impl GitLabApi for MockGitLab {
    fn web_url(&self) -> &str {
        "https://gitlab.example.com"
    }

    async fn get(&self, path: &str, _query: &[(&str, String)]) -> Result<Value> {
        self.check_error(path)?;
        self.documents
            .get(path)
            .cloned()
            .ok_or_else(|| not_found(path))
    }

    async fn get_page(
        &self,
        path: &str,
        query: &[(&str, String)],
        page: u32,
        _per_page: u32,
    ) -> Result<Page> {
        self.check_error(path)?;
        self.page_requests
            .lock()
            .expect("page requests poisoned")
            .push((
                path.to_string(),
                page,
                query
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), v.clone()))
                    .collect(),
            ));

        let pages = self.pages.get(path).ok_or_else(|| not_found(path))?;
        let index = page.saturating_sub(1) as usize;
        let items = pages.get(index).cloned().unwrap_or_default();
        let next_page = (index + 1 < pages.len()).then_some(page + 1);

        Ok(Page { items, next_page })
    }

    async fn get_file(
        &self,
        _project: &str,
        file_path: &str,
        _ref_: Option<&str>,
    ) -> Result<String> {
        self.files
            .get(file_path)
            .cloned()
            .ok_or_else(|| not_found(file_path))
    }

    async fn graphql(
        &self,
        _query: &'static str,
        _operation_name: &'static str,
        variables: Value,
    ) -> Result<Value> {
        self.graphql_calls
            .lock()
            .expect("graphql calls poisoned")
            .push(variables);
        self.graphql_responses
            .lock()
            .expect("graphql queue poisoned")
            .pop_front()
            .ok_or_else(|| GlInsightsError::Api {
                status: 200,
                message: "no GraphQL response queued".to_string(),
            })
    }
}
