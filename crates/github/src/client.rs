//! REST client implementing the routing ports.
//!
//! [`GitHubClient`] is the [`GitHubConnector`]: it is built once at startup and
//! hands out an [`InstallationClient`] per delivery. The installation client is
//! the [`GitHubApi`] and carries the bearer token for that delivery only;
//! nothing is cached between deliveries.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{ACCEPT, RETRY_AFTER};
use reqwest::{Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use routing::{
    CommentId, DispatchInputs, GitHubApi, GitHubConnector, InstallationId, IssueComment,
    IssueNumber, RepositoryRef, RouterError, UserLogin, WorkflowDispatch,
};

use crate::auth::{AppCredentials, Credentials};
use crate::error::GitHubError;

/// Public GitHub REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// REST API version pinned on every request.
pub const API_VERSION: &str = "2022-11-28";

const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const GITHUB_JSON: &str = "application/vnd.github+json";

/// Connection settings for [`GitHubClient`].
#[derive(Debug, Clone)]
pub struct GitHubClientConfig {
    /// Base URL without trailing slash (`https://api.github.com`, or a GitHub
    /// Enterprise `https://host/api/v3`).
    pub api_url: String,
    /// `User-Agent` header; GitHub rejects requests without one.
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for GitHubClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            user_agent: concat!("cibridge/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct AccessToken {
    token: String,
}

#[derive(Deserialize)]
struct RawUser {
    login: String,
}

#[derive(Deserialize)]
struct RawComment {
    id: u64,
    body: Option<String>,
    user: Option<RawUser>,
}

#[derive(Serialize)]
struct CommentBody<'a> {
    body: &'a str,
}

#[derive(Serialize)]
struct DispatchBody<'a> {
    #[serde(rename = "ref")]
    git_ref: &'a str,
    inputs: &'a DispatchInputs,
}

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

/// Factory for per-delivery [`InstallationClient`]s.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    credentials: Credentials,
}

impl GitHubClient {
    /// Builds the HTTP client. Connections are pooled across deliveries; tokens
    /// are not.
    pub fn new(config: GitHubClientConfig, credentials: Credentials) -> Result<Self, GitHubError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Exchanges a freshly signed App JWT for an installation token.
    #[instrument(skip(self, app), fields(app_id = app.app_id()))]
    async fn installation_token(
        &self,
        app: &AppCredentials,
        installation: InstallationId,
    ) -> Result<String, GitHubError> {
        let jwt = app.app_jwt(Utc::now())?;
        let url = format!(
            "{}/app/installations/{}/access_tokens",
            self.api_url, installation
        );
        let response = self
            .http
            .post(url)
            .bearer_auth(jwt)
            .header(ACCEPT, GITHUB_JSON)
            .header(API_VERSION_HEADER, API_VERSION)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let (message, retry_after) = read_error(response).await;
            return Err(GitHubError::TokenExchange {
                status: status.as_u16(),
                message,
                retry_after,
            });
        }

        let token: AccessToken = response.json().await?;
        debug!(%installation, "Installation token minted");
        Ok(token.token)
    }
}

#[async_trait]
impl GitHubConnector for GitHubClient {
    async fn connect(
        &self,
        installation: Option<InstallationId>,
    ) -> Result<Box<dyn GitHubApi>, RouterError> {
        let token = match (&self.credentials, installation) {
            (Credentials::Token(token), _) => token.clone(),
            (Credentials::App(app), Some(installation)) => {
                self.installation_token(app, installation).await?
            }
            (Credentials::App(_), None) => return Err(RouterError::MissingInstallation),
        };

        Ok(Box::new(InstallationClient {
            http: self.http.clone(),
            api_url: self.api_url.clone(),
            token,
        }))
    }
}

// ---------------------------------------------------------------------------
// Installation client
// ---------------------------------------------------------------------------

/// REST calls authorised with one bearer token.
pub struct InstallationClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl InstallationClient {
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.api_url, path))
            .bearer_auth(&self.token)
            .header(ACCEPT, GITHUB_JSON)
            .header(API_VERSION_HEADER, API_VERSION)
    }

    async fn send(&self, method: Method, path: &str, request: RequestBuilder) -> Result<Response, GitHubError> {
        let response = request.send().await?;
        let status = response.status();
        debug!(%method, path, status = status.as_u16(), "GitHub request");
        if status.is_success() {
            return Ok(response);
        }

        let (message, retry_after) = read_error(response).await;
        Err(GitHubError::Api {
            status: status.as_u16(),
            message,
            retry_after,
        })
    }
}

#[async_trait]
impl GitHubApi for InstallationClient {
    async fn get_comment(
        &self,
        repository: &RepositoryRef,
        comment_id: CommentId,
    ) -> Result<IssueComment, RouterError> {
        let path = format!(
            "/repos/{}/{}/issues/comments/{}",
            repository.owner, repository.name, comment_id
        );
        let response = self
            .send(Method::GET, &path, self.request(Method::GET, &path))
            .await?;
        let raw: RawComment = response.json().await.map_err(GitHubError::from)?;

        let author = raw
            .user
            .and_then(|u| UserLogin::new(u.login))
            .ok_or_else(|| GitHubError::UnexpectedResponse(format!("comment {comment_id} has no author")))?;

        Ok(IssueComment {
            id: CommentId::new(raw.id),
            body: raw.body.unwrap_or_default(),
            author,
        })
    }

    async fn update_comment(
        &self,
        repository: &RepositoryRef,
        comment_id: CommentId,
        body: &str,
    ) -> Result<(), RouterError> {
        let path = format!(
            "/repos/{}/{}/issues/comments/{}",
            repository.owner, repository.name, comment_id
        );
        let request = self
            .request(Method::PATCH, &path)
            .json(&CommentBody { body });
        self.send(Method::PATCH, &path, request).await?;
        Ok(())
    }

    async fn create_comment(
        &self,
        repository: &RepositoryRef,
        issue_number: IssueNumber,
        body: &str,
    ) -> Result<CommentId, RouterError> {
        let path = format!(
            "/repos/{}/{}/issues/{}/comments",
            repository.owner, repository.name, issue_number
        );
        let request = self
            .request(Method::POST, &path)
            .json(&CommentBody { body });
        let response = self.send(Method::POST, &path, request).await?;
        let created: RawComment = response.json().await.map_err(GitHubError::from)?;
        Ok(CommentId::new(created.id))
    }

    async fn dispatch_workflow(&self, dispatch: &WorkflowDispatch) -> Result<(), RouterError> {
        let path = format!(
            "/repos/{}/{}/actions/workflows/{}/dispatches",
            dispatch.repository.owner, dispatch.repository.name, dispatch.workflow
        );
        let request = self.request(Method::POST, &path).json(&DispatchBody {
            git_ref: dispatch.git_ref.as_str(),
            inputs: &dispatch.inputs,
        });
        self.send(Method::POST, &path, request).await?;
        Ok(())
    }
}

/// Extracts GitHub's `message` (falling back to the raw body) and any
/// `Retry-After` delay from an error response.
async fn read_error(response: Response) -> (String, Option<Duration>) {
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);

    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ApiErrorBody>(&text) {
        Ok(body) => body.message,
        Err(_) => text,
    };
    (message, retry_after)
}
