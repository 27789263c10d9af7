use log::{debug, warn};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use url::Url;

use crate::auth::Token;
use crate::config::{Config, RetryPolicy};
use crate::error::{GlInsightsError, Result};

pub struct GitLabClient {
    pub client: Client,
    pub web_url: String,
    pub api_url: Url,
    pub graphql_url: Url,
    pub token: Token,
    pub retry: RetryPolicy,
}

impl GitLabClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("glinsights/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| GlInsightsError::Config(format!("Failed to create HTTP client: {e}")))?;

        // Url::join drops the last path segment unless it ends with '/'
        let mut base = config.gitlab_url.clone();
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }

        let api_url = base
            .join("api/v4/")
            .map_err(|e| GlInsightsError::Config(format!("Invalid API base URL: {e}")))?;
        let graphql_url = base
            .join("api/graphql")
            .map_err(|e| GlInsightsError::Config(format!("Invalid GraphQL URL: {e}")))?;

        Ok(Self {
            client,
            web_url: base.as_str().trim_end_matches('/').to_string(),
            api_url,
            graphql_url,
            token: config.token.clone(),
            retry: config.retry,
        })
    }

    pub fn auth_request(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(self.token.as_str())
    }

    pub fn endpoint_url(&self, path: &str) -> Result<Url> {
        self.api_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| GlInsightsError::Config(format!("Invalid endpoint '{path}': {e}")))
    }

    /// Sends the request built by `build`, retrying rate-limited responses per
    /// the configured policy. Any other failure is returned immediately.
    pub async fn execute<F>(&self, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let mut attempt = 0;
        loop {
            let response = self.auth_request(build()).send().await?;
            debug!("{} {}", response.status(), response.url().path());

            match check_status(response).await {
                Err(GlInsightsError::RateLimit { retry_after_secs })
                    if attempt < self.retry.max_retries =>
                {
                    let delay = self.retry.delay_for(attempt, retry_after_secs);
                    warn!(
                        "Rate limited by GitLab, retrying in {}s (attempt {}/{})",
                        delay.as_secs(),
                        attempt + 1,
                        self.retry.max_retries
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

/// Maps non-success HTTP statuses onto the error taxonomy.
pub async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let path = response.url().path().to_string();
    let retry_after_secs = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            GlInsightsError::Auth(format!("{status} on {path}: {message}"))
        }
        StatusCode::NOT_FOUND => GlInsightsError::NotFound(format!("{path}: {message}")),
        StatusCode::TOO_MANY_REQUESTS => GlInsightsError::RateLimit { retry_after_secs },
        _ => GlInsightsError::Api {
            status: status.as_u16(),
            message: format!("{path}: {message}"),
        },
    })
}

/// GitLab wraps errors as `{"message": ...}` or `{"error": ...}`.
fn error_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let from_json = parsed.as_ref().and_then(|v| {
        v.get("message")
            .or_else(|| v.get("error"))
            .map(|m| match m {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
    });

    match from_json {
        Some(message) => message,
        None if body.trim().is_empty() => "no response body".to_string(),
        None => body.chars().take(200).collect(),
    }
}
