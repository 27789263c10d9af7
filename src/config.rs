use std::time::Duration;

use url::Url;

use crate::auth::Token;
use crate::error::{GlInsightsError, Result};

pub const DEFAULT_GITLAB_URL: &str = "https://gitlab.com";

/// Read-only settings shared by every tool invocation.
#[derive(Debug, Clone)]
pub struct Config {
    pub gitlab_url: Url,
    pub token: Token,
    pub default_project: Option<String>,
    pub retry: RetryPolicy,
    pub timeout: Duration,
}

impl Config {
    pub fn new(
        gitlab_url: &str,
        token: Option<&str>,
        default_project: Option<String>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self> {
        let token = token.ok_or_else(|| {
            GlInsightsError::Config(
                "GitLab access token is missing (set GITLAB_TOKEN or pass --token)".to_string(),
            )
        })?;
        let token = Token::new(token)?;

        let gitlab_url = Url::parse(gitlab_url)
            .map_err(|e| GlInsightsError::Config(format!("Invalid GitLab URL: {e}")))?;
        if !matches!(gitlab_url.scheme(), "http" | "https") {
            return Err(GlInsightsError::Config(format!(
                "GitLab URL must be http(s), got '{}'",
                gitlab_url.scheme()
            )));
        }

        let default_project = default_project
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        Ok(Self {
            gitlab_url,
            token,
            default_project,
            retry,
            timeout,
        })
    }
}

/// Backoff applied to rate-limited (HTTP 429) responses only.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    #[cfg(test)]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-based). `Retry-After` wins over the
    /// exponential schedule; both are capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
        let delay = match retry_after_secs {
            Some(secs) => Duration::from_secs(secs),
            None => self
                .base_delay
                .saturating_mul(2u32.saturating_pow(attempt)),
        };
        delay.min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(url: &str, token: Option<&str>) -> Result<Config> {
        Config::new(
            url,
            token,
            None,
            RetryPolicy::default(),
            Duration::from_secs(30),
        )
    }

    #[test]
    fn test_missing_token_is_config_error() {
        let err = build(DEFAULT_GITLAB_URL, None).unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_invalid_url_is_config_error() {
        let err = build("not a url", Some("glpat-abc")).unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_non_http_scheme_is_rejected() {
        let err = build("ftp://gitlab.example.com", Some("glpat-abc")).unwrap_err();
        assert!(err.to_string().contains("http(s)"));
    }

    #[test]
    fn test_blank_default_project_is_dropped() {
        let config = Config::new(
            "https://gitlab.example.com",
            Some("glpat-abc"),
            Some("   ".to_string()),
            RetryPolicy::default(),
            Duration::from_secs(30),
        )
        .unwrap();

        assert!(config.default_project.is_none());
    }

    #[test]
    fn test_delay_grows_exponentially_and_is_capped() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.delay_for(0, None), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1, None), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2, None), Duration::from_secs(4));
        assert_eq!(policy.delay_for(10, None), Duration::from_secs(60));
    }

    #[test]
    fn test_retry_after_overrides_schedule() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.delay_for(0, Some(7)), Duration::from_secs(7));
        assert_eq!(policy.delay_for(0, Some(600)), Duration::from_secs(60));
    }
}
