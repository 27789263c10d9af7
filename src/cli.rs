use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;

use crate::config::{Config, RetryPolicy, DEFAULT_GITLAB_URL};
use crate::providers::gitlab::client::GitLabClient;
use crate::providers::gitlab::GitLabProvider;
use crate::providers::registry::{HttpRegistry, RegistryUrls};
use crate::server::McpServer;
use crate::tools::ToolDispatcher;

#[derive(Parser)]
#[command(name = "glinsights")]
#[command(author, version, about = "GitLab analytics tools for AI assistants", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// GitLab access token
    #[arg(short, long, global = true, env = "GITLAB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// GitLab instance URL
    #[arg(short, long, global = true, env = "GITLAB_URL", default_value = DEFAULT_GITLAB_URL)]
    url: String,

    /// Project used when a tool call does not name one (ID or "group/project")
    #[arg(short = 'P', long, global = true, env = "GITLAB_DEFAULT_PROJECT")]
    project: Option<String>,

    /// Retries for rate-limited (HTTP 429) requests
    #[arg(long, global = true, env = "GITLAB_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Per-request timeout in seconds
    #[arg(long, global = true, env = "GITLAB_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// Output file path (defaults to stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Pretty print JSON output
    #[arg(long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the tools over stdio (JSON-RPC, one message per line)
    Serve,

    /// Print the available tools and their input schemas
    Tools,

    /// Run a single tool and print its result
    Call {
        /// Tool name, e.g. "pipeline_health"
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Serve => {
                let dispatcher = self.dispatcher()?;
                McpServer::new(Arc::new(dispatcher)).run().await?;
                Ok(())
            }
            Commands::Tools => {
                // Listing tools needs no credentials
                self.write_output(&crate::tools::tool_definitions())
            }
            Commands::Call { tool, args } => {
                let args: serde_json::Value =
                    serde_json::from_str(args).context("--args must be a JSON object")?;

                info!("Running tool {tool} once");
                let result = self.dispatcher()?.call(tool, args).await?;
                self.write_output(&result)
            }
        }
    }

    fn dispatcher(&self) -> Result<ToolDispatcher> {
        let timeout = Duration::from_secs(self.timeout_secs);
        let retry = RetryPolicy {
            max_retries: self.max_retries,
            ..RetryPolicy::default()
        };

        let config = Config::new(
            &self.url,
            self.token.as_deref(),
            self.project.clone(),
            retry,
            timeout,
        )?;
        info!("Using GitLab instance: {}", config.gitlab_url);

        let client = GitLabClient::new(&config)?;
        let registry = HttpRegistry::new(RegistryUrls::public()?, timeout)?;
        let provider = GitLabProvider::new(Arc::new(client), Arc::new(registry));

        Ok(ToolDispatcher::new(
            Arc::new(provider),
            config.default_project,
        ))
    }

    fn write_output<T: Serialize>(&self, value: &T) -> Result<()> {
        let json_output = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, json_output)?;
            info!("Result written to: {}", output_path.display());
        } else {
            println!("{json_output}");
        }

        Ok(())
    }
}
