//! Process configuration.
//!
//! Every setting is a command-line flag that falls back to an environment
//! variable. A `.env` file in the working directory is loaded before parsing.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};

use github::{AppCredentials, Credentials, GitHubClientConfig, DEFAULT_API_URL};
use listener::{WebhookConfig, WebhookSecret, DEFAULT_WEBHOOK_PATH};
use routing::{RouterConfig, WorkflowId, DEFAULT_WORKFLOW};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human-readable, for local development.
    Pretty,
}

/// Bridges GitHub comments and pull requests to CI workflow runs.
#[derive(Parser)]
#[command(name = "cibridge", version, about)]
pub struct Args {
    /// GitHub App id.
    #[arg(long, env = "APP_ID")]
    pub app_id: Option<u64>,

    /// Path to the GitHub App's PEM private key.
    #[arg(long, env = "PRIVATE_KEY_PATH")]
    pub private_key_path: Option<PathBuf>,

    /// Static token used instead of App authentication.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Shared secret GitHub signs deliveries with.
    #[arg(long, env = "WEBHOOK_SECRET", hide_env_values = true)]
    pub webhook_secret: String,

    /// Interface to bind.
    #[arg(long, env = "HOST", default_value = "localhost")]
    pub host: String,

    /// Port to bind.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Path deliveries are POSTed to.
    #[arg(long, env = "WEBHOOK_PATH", default_value = DEFAULT_WEBHOOK_PATH)]
    pub webhook_path: String,

    /// GitHub REST API base URL.
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub github_api_url: String,

    /// Workflow file dispatched for every trigger.
    #[arg(long, env = "CI_WORKFLOW", default_value = DEFAULT_WORKFLOW)]
    pub ci_workflow: String,

    /// Timeout for each GitHub API request, in seconds.
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub http_timeout_secs: u64,

    /// How long shutdown waits for accepted deliveries to finish, in seconds.
    #[arg(long, env = "SHUTDOWN_TIMEOUT_SECS", default_value_t = 30)]
    pub shutdown_timeout_secs: u64,

    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,

    /// OTLP collector endpoint; span export is disabled when unset.
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

/// Validated settings for every component.
#[derive(Debug)]
pub struct Settings {
    pub bind_address: String,
    pub webhook: WebhookConfig,
    pub credentials: Credentials,
    pub github: GitHubClientConfig,
    pub router: RouterConfig,
    pub shutdown_timeout: Duration,
}

impl Args {
    /// Validates the arguments and loads the private key.
    pub fn into_settings(self) -> Result<Settings> {
        let credentials = self.credentials()?;

        if !self.webhook_path.starts_with('/') {
            bail!("WEBHOOK_PATH must start with '/', got '{}'", self.webhook_path);
        }
        if self.http_timeout_secs == 0 {
            bail!("HTTP_TIMEOUT_SECS must be greater than zero");
        }

        let secret =
            WebhookSecret::new(self.webhook_secret).context("WEBHOOK_SECRET must not be empty")?;
        let workflow = WorkflowId::new(self.ci_workflow).context("CI_WORKFLOW must not be empty")?;

        Ok(Settings {
            bind_address: format!("{}:{}", self.host, self.port),
            webhook: WebhookConfig {
                path: self.webhook_path,
                secret,
            },
            credentials,
            github: GitHubClientConfig {
                api_url: self.github_api_url.trim_end_matches('/').to_string(),
                timeout: Duration::from_secs(self.http_timeout_secs),
                ..GitHubClientConfig::default()
            },
            router: RouterConfig::new(workflow),
            shutdown_timeout: Duration::from_secs(self.shutdown_timeout_secs),
        })
    }

    fn credentials(&self) -> Result<Credentials> {
        if let Some(token) = self.github_token.as_deref().filter(|t| !t.is_empty()) {
            return Ok(Credentials::Token(token.to_string()));
        }

        let (Some(app_id), Some(key_path)) = (self.app_id, self.private_key_path.as_ref()) else {
            bail!("either GITHUB_TOKEN or both APP_ID and PRIVATE_KEY_PATH must be set");
        };

        let pem = std::fs::read(key_path)
            .with_context(|| format!("failed to read private key {}", key_path.display()))?;
        let app = AppCredentials::from_pem(app_id, &pem)
            .with_context(|| format!("invalid private key {}", key_path.display()))?;
        Ok(Credentials::App(app))
    }
}
