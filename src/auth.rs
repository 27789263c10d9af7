use crate::error::{GlInsightsError, Result};

/// GitLab personal/project access token. Never printed.
#[derive(Clone)]
pub struct Token(String);

impl Token {
    pub fn new(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(GlInsightsError::Config(
                "GitLab access token is empty (set GITLAB_TOKEN or pass --token)".to_string(),
            ));
        }
        Ok(Self(value.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<redacted>")
    }
}
