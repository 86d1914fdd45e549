//! Port traits through which the router reaches GitHub.
//!
//! The `github` crate implements these over the REST API; tests implement them
//! in memory. Every method is a single outbound call with no retry.

use async_trait::async_trait;

use crate::events::InboundEvent;
use crate::router::HandleOutcome;
use crate::{
    CommentId, InstallationId, IssueComment, IssueNumber, RepositoryRef, RouterError,
    WorkflowDispatch,
};

/// REST operations the router issues, already authorised for one installation.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// `GET /repos/{owner}/{repo}/issues/comments/{comment_id}`.
    async fn get_comment(
        &self,
        repository: &RepositoryRef,
        comment_id: CommentId,
    ) -> Result<IssueComment, RouterError>;

    /// `PATCH /repos/{owner}/{repo}/issues/comments/{comment_id}`, replacing
    /// the body.
    async fn update_comment(
        &self,
        repository: &RepositoryRef,
        comment_id: CommentId,
        body: &str,
    ) -> Result<(), RouterError>;

    /// `POST /repos/{owner}/{repo}/issues/{issue_number}/comments`.
    async fn create_comment(
        &self,
        repository: &RepositoryRef,
        issue_number: IssueNumber,
        body: &str,
    ) -> Result<CommentId, RouterError>;

    /// `POST /repos/{owner}/{repo}/actions/workflows/{workflow_id}/dispatches`.
    async fn dispatch_workflow(&self, dispatch: &WorkflowDispatch) -> Result<(), RouterError>;
}

/// Consumer of verified inbound events. Implemented by
/// [`crate::router::EventRouter`]; the listener depends only on this trait.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handles one delivery to completion.
    async fn handle(&self, event: InboundEvent) -> HandleOutcome;
}

/// Produces a [`GitHubApi`] acting as a given installation.
///
/// Called once per delivery. Implementations must not share mutable state
/// between deliveries beyond what the HTTP client itself pools.
#[async_trait]
pub trait GitHubConnector: Send + Sync {
    /// Authenticates as `installation` (or with the connector's own static
    /// credentials when `installation` is `None`).
    async fn connect(
        &self,
        installation: Option<InstallationId>,
    ) -> Result<Box<dyn GitHubApi>, RouterError>;
}
