//! Routing domain for cibridge.
//!
//! cibridge connects GitHub webhooks to GitHub Actions workflow dispatch: a
//! keyword in a pull request title or an issue comment dispatches a CI
//! workflow, and when that workflow completes its result is written back to
//! the comment or pull request that asked for it.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`CommentId`, `OwnerLogin`, etc.) |
//! | [`types`] | Shared value types (`RepositoryRef`, `Conclusion`, `WorkflowDispatch`, etc.) |
//! | [`events`] | Decoded inbound webhook events |
//! | [`trigger`] | Trigger keyword detection |
//! | [`correlation`] | Correlation token codec carried through workflow run names |
//! | [`errors`] | Router error and retry-policy types |
//! | [`ports`] | Traits implemented by the GitHub adapter and consumed by the listener |
//! | [`router`] | The [`EventRouter`] |

pub mod correlation;
pub mod errors;
pub mod events;
pub mod identifiers;
pub mod ports;
pub mod router;
pub mod trigger;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use correlation::{CorrelationError, CorrelationToken};
pub use errors::{RetryPolicy, RouterError};
pub use events::{InboundEvent, IssueCommentCreated, PullRequestOpened, WorkflowRunCompleted};
pub use identifiers::{
    BranchName, CommentId, InstallationId, IssueNumber, OwnerLogin, RepositoryName, UserLogin,
    WorkflowId,
};
pub use ports::{EventHandler, GitHubApi, GitHubConnector};
pub use router::{EventRouter, HandleOutcome, IgnoreReason, RouterConfig, DEFAULT_WORKFLOW};
pub use trigger::{TriggerMatcher, DEFAULT_TRIGGER_KEYWORD};
pub use types::{Conclusion, DispatchInputs, IssueComment, RepositoryRef, WorkflowDispatch};
