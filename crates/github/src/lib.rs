//! cibridge GitHub infrastructure adapter.
//!
//! Implements the GitHub-facing ports defined in the [`routing`] crate
//! ([`routing::GitHubConnector`] and [`routing::GitHubApi`]) over the GitHub
//! REST API with `reqwest`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain routing rules.
//! Authentication (App JWT, installation tokens), headers, URL shapes, and
//! error-body decoding are handled here; the [`routing`] crate never sees them.
//!
//! ## Calls
//!
//! | Port method | Endpoint |
//! |-------------|----------|
//! | `get_comment` | `GET /repos/{owner}/{repo}/issues/comments/{comment_id}` |
//! | `update_comment` | `PATCH /repos/{owner}/{repo}/issues/comments/{comment_id}` |
//! | `create_comment` | `POST /repos/{owner}/{repo}/issues/{issue_number}/comments` |
//! | `dispatch_workflow` | `POST /repos/{owner}/{repo}/actions/workflows/{workflow_id}/dispatches` |
//!
//! Every request carries `X-GitHub-Api-Version: 2022-11-28`. Calls are made
//! once; failures are returned to the router, which logs them.

pub mod auth;
pub mod client;
pub mod error;

pub use auth::{AppClaims, AppCredentials, Credentials};
pub use client::{GitHubClient, GitHubClientConfig, InstallationClient, API_VERSION, DEFAULT_API_URL};
pub use error::GitHubError;
