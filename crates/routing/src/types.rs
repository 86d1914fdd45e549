//! Shared value types for the routing domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types group
//! identifiers into the shapes the router reads from GitHub and writes back to
//! it: repository coordinates, fetched comments, and workflow dispatch requests.

use serde::{Deserialize, Serialize};

use crate::{BranchName, CommentId, OwnerLogin, RepositoryName, UserLogin, WorkflowId};

// ---------------------------------------------------------------------------
// Repository coordinates
// ---------------------------------------------------------------------------

/// A repository addressed by `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryRef {
    /// Owning account login.
    pub owner: OwnerLogin,
    /// Repository short name.
    pub name: RepositoryName,
}

impl RepositoryRef {
    /// Creates a [`RepositoryRef`].
    pub fn new(owner: OwnerLogin, name: RepositoryName) -> Self {
        Self { owner, name }
    }
}

impl std::fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

// ---------------------------------------------------------------------------
// Workflow run results
// ---------------------------------------------------------------------------

/// Conclusion reported by a completed workflow run (`"success"`, `"failure"`,
/// `"cancelled"`, ...).
///
/// Kept as the literal string GitHub sends so that new conclusion values are
/// reported verbatim rather than collapsed into a catch-all.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Conclusion(String);

impl Conclusion {
    /// Creates a [`Conclusion`]. A missing or empty value becomes `"unknown"`.
    pub fn new(value: Option<String>) -> Self {
        match value {
            Some(v) if !v.is_empty() => Self(v),
            _ => Self("unknown".to_string()),
        }
    }

    /// Returns the conclusion as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Conclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

/// An issue comment as returned by `GET /repos/{owner}/{repo}/issues/comments/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueComment {
    /// Comment id.
    pub id: CommentId,
    /// Markdown body. GitHub returns `null` for some deleted-content cases,
    /// which is surfaced here as an empty string.
    pub body: String,
    /// Login of the comment author.
    pub author: UserLogin,
}

// ---------------------------------------------------------------------------
// Workflow dispatch
// ---------------------------------------------------------------------------

/// The `inputs` map sent with a workflow dispatch.
///
/// All four values are strings on the wire; the workflow joins them with `|`
/// into its run name, which is how the completion event is correlated back to
/// the trigger. Values are already escaped by
/// [`crate::correlation::CorrelationToken::to_dispatch_inputs`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchInputs {
    /// Repository owner (comment trigger) or PR author (pull request trigger).
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Comment id or pull request number, stringified.
    pub comment_id: String,
    /// `"comment"` or `"pull_request"`.
    pub event_type: String,
}

/// A fully resolved workflow dispatch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowDispatch {
    /// Repository holding the workflow.
    pub repository: RepositoryRef,
    /// Workflow file name or id.
    pub workflow: WorkflowId,
    /// Git ref the workflow runs on.
    pub git_ref: BranchName,
    /// Inputs carrying the correlation token fields.
    pub inputs: DispatchInputs,
}
