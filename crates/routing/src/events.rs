//! Inbound webhook events understood by the router.
//!
//! The listener decodes raw GitHub payloads into these types; everything the
//! router needs is lifted out of the JSON so routing decisions never touch
//! untyped data.

use crate::{
    BranchName, CommentId, Conclusion, InstallationId, IssueNumber, RepositoryRef, UserLogin,
};

/// A verified, decoded webhook delivery.
///
/// One variant per `(X-GitHub-Event, payload.action)` pair the bridge reacts
/// to. Deliveries outside this set never reach the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// `workflow_run` with `action == "completed"`.
    WorkflowRunCompleted(WorkflowRunCompleted),
    /// `pull_request` with `action == "opened"`.
    PullRequestOpened(PullRequestOpened),
    /// `issue_comment` with `action == "created"`.
    IssueCommentCreated(IssueCommentCreated),
}

impl InboundEvent {
    /// The `event.action` label, used for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::WorkflowRunCompleted(_) => "workflow_run.completed",
            Self::PullRequestOpened(_) => "pull_request.opened",
            Self::IssueCommentCreated(_) => "issue_comment.created",
        }
    }

    /// The repository the event was delivered for.
    pub fn repository(&self) -> &RepositoryRef {
        match self {
            Self::WorkflowRunCompleted(e) => &e.repository,
            Self::PullRequestOpened(e) => &e.repository,
            Self::IssueCommentCreated(e) => &e.repository,
        }
    }

    /// The GitHub App installation that delivered the event, if any.
    pub fn installation(&self) -> Option<InstallationId> {
        match self {
            Self::WorkflowRunCompleted(e) => e.installation,
            Self::PullRequestOpened(e) => e.installation,
            Self::IssueCommentCreated(e) => e.installation,
        }
    }
}

/// A workflow run finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRunCompleted {
    pub repository: RepositoryRef,
    pub installation: Option<InstallationId>,
    /// The run name; carries the correlation token for dispatched runs.
    pub run_name: String,
    pub conclusion: Conclusion,
    /// Link to the run's results page.
    pub html_url: String,
}

/// A pull request was opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestOpened {
    pub repository: RepositoryRef,
    pub installation: Option<InstallationId>,
    pub number: IssueNumber,
    pub title: String,
    pub author: UserLogin,
    /// Head branch of the pull request.
    pub head_ref: BranchName,
}

/// A comment was posted on an issue or pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueCommentCreated {
    pub repository: RepositoryRef,
    pub installation: Option<InstallationId>,
    pub comment_id: CommentId,
    pub issue_number: IssueNumber,
    pub body: String,
    pub author: UserLogin,
}
