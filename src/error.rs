use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GlInsightsError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited by GitLab{}", retry_hint(.retry_after_secs))]
    RateLimit { retry_after_secs: Option<u64> },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unsupported manifest format: {0}")]
    UnsupportedFormat(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("API request failed ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON decoding error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    retry_after_secs
        .map(|secs| format!(", retry after {secs}s"))
        .unwrap_or_default()
}

impl GlInsightsError {
    /// Stable machine-readable category reported to tool callers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::NotFound(_) => "not_found",
            Self::RateLimit { .. } => "rate_limit",
            Self::Network(_) => "network",
            Self::InvalidParameter(_) => "invalid_parameter",
            Self::UnsupportedFormat(_) => "unsupported_format",
            Self::UnknownTool(_) => "unknown_tool",
            Self::Api { .. } => "api",
            Self::Config(_) => "config",
            Self::Decode(_) => "decode",
            Self::Io(_) => "io",
        }
    }

    pub fn to_tool_error(&self) -> ToolError {
        ToolError {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

/// Structured error returned to the tool caller.
#[derive(Debug, Clone, Serialize)]
pub struct ToolError {
    pub kind: &'static str,
    pub message: String,
}

pub type Result<T> = std::result::Result<T, GlInsightsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_is_stable_per_variant() {
        assert_eq!(GlInsightsError::Auth("x".into()).kind(), "auth");
        assert_eq!(GlInsightsError::NotFound("x".into()).kind(), "not_found");
        assert_eq!(
            GlInsightsError::RateLimit {
                retry_after_secs: None
            }
            .kind(),
            "rate_limit"
        );
        assert_eq!(
            GlInsightsError::InvalidParameter("x".into()).kind(),
            "invalid_parameter"
        );
        assert_eq!(
            GlInsightsError::UnsupportedFormat("x".into()).kind(),
            "unsupported_format"
        );
        assert_eq!(
            GlInsightsError::Api {
                status: 500,
                message: "boom".into()
            }
            .kind(),
            "api"
        );
    }

    #[test]
    fn test_rate_limit_message_includes_retry_after() {
        let err = GlInsightsError::RateLimit {
            retry_after_secs: Some(12),
        };
        assert_eq!(err.to_string(), "Rate limited by GitLab, retry after 12s");

        let err = GlInsightsError::RateLimit {
            retry_after_secs: None,
        };
        assert_eq!(err.to_string(), "Rate limited by GitLab");
    }

    #[test]
    fn test_tool_error_serializes_kind_and_message() {
        let err = GlInsightsError::NotFound("Project 'a/b' not found".into());
        let value = serde_json::to_value(err.to_tool_error()).unwrap();

        assert_eq!(value["kind"], "not_found");
        assert_eq!(value["message"], "Not found: Project 'a/b' not found");
    }
}
