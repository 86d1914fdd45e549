//! The event router: decides, for each verified delivery, which REST calls to
//! make.
//!
//! ## Routing table
//!
//! | Event | Condition | Action |
//! |-------|-----------|--------|
//! | `workflow_run.completed` | run name decodes to a `comment` token | fetch the comment, rewrite it with the result |
//! | `workflow_run.completed` | run name decodes to a `pull_request` token | post a new comment on the PR |
//! | `pull_request.opened` | title contains the keyword | dispatch on the PR head branch |
//! | `issue_comment.created` | body contains `<keyword>_<branch>` | dispatch on `<branch>` |
//!
//! Everything else is ignored. The router holds no mutable state; concurrent
//! deliveries never observe each other.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, instrument, warn};

use crate::correlation::{CorrelationError, CorrelationToken};
use crate::events::{InboundEvent, IssueCommentCreated, PullRequestOpened, WorkflowRunCompleted};
use crate::ports::{EventHandler, GitHubConnector};
use crate::trigger::{TriggerMatcher, DEFAULT_TRIGGER_KEYWORD};
use crate::{
    BranchName, CommentId, InstallationId, IssueComment, IssueNumber, RepositoryRef, RetryPolicy,
    RouterError, WorkflowDispatch, WorkflowId,
};

/// Workflow file dispatched when none is configured.
pub const DEFAULT_WORKFLOW: &str = "test.yml";

/// Static router settings.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Workflow dispatched for every trigger.
    pub workflow: WorkflowId,
    /// Keyword that requests a CI run.
    pub trigger_keyword: String,
}

impl RouterConfig {
    /// Creates a config dispatching `workflow` on the default keyword.
    pub fn new(workflow: WorkflowId) -> Self {
        Self {
            workflow,
            trigger_keyword: DEFAULT_TRIGGER_KEYWORD.to_string(),
        }
    }
}

/// Why a delivery produced no outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Pull request title has no trigger keyword.
    TitleWithoutTrigger,
    /// Comment body has no `<keyword>_<branch>`.
    CommentWithoutTrigger,
    /// Completed run was not started by the bridge.
    UnrelatedWorkflowRun,
}

/// Result of handling one delivery.
#[derive(Debug)]
pub enum HandleOutcome {
    /// A workflow dispatch was accepted.
    Dispatched {
        repository: RepositoryRef,
        git_ref: BranchName,
        token: CorrelationToken,
    },
    /// The triggering comment was rewritten with the run result.
    CommentUpdated {
        repository: RepositoryRef,
        comment_id: CommentId,
    },
    /// A result comment was posted on a pull request.
    CommentCreated {
        repository: RepositoryRef,
        issue_number: IssueNumber,
        comment_id: CommentId,
    },
    /// Nothing to do.
    Ignored(IgnoreReason),
    /// Handling failed; the error has already been logged.
    Failed(RouterError),
}

impl HandleOutcome {
    /// Short label for log fields.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Dispatched { .. } => "dispatched",
            Self::CommentUpdated { .. } => "comment_updated",
            Self::CommentCreated { .. } => "comment_created",
            Self::Ignored(_) => "ignored",
            Self::Failed(_) => "failed",
        }
    }
}

/// Routes verified webhook events to GitHub REST calls.
///
/// Constructed once at startup and shared behind an [`Arc`] by every delivery.
pub struct EventRouter {
    connector: Arc<dyn GitHubConnector>,
    workflow: WorkflowId,
    trigger: TriggerMatcher,
}

impl EventRouter {
    /// Creates a router issuing calls through `connector`.
    pub fn new(connector: Arc<dyn GitHubConnector>, config: RouterConfig) -> Result<Self, RouterError> {
        let trigger =
            TriggerMatcher::new(&config.trigger_keyword).map_err(|e| RouterError::Configuration {
                message: format!("invalid trigger keyword '{}': {e}", config.trigger_keyword),
            })?;
        Ok(Self {
            connector,
            workflow: config.workflow,
            trigger,
        })
    }

    /// Handles one delivery. Never fails: errors are logged and returned as
    /// [`HandleOutcome::Failed`].
    #[instrument(
        skip_all,
        fields(event = event.kind(), repository = %event.repository())
    )]
    pub async fn handle(&self, event: InboundEvent) -> HandleOutcome {
        let outcome = match self.route(event).await {
            Ok(outcome) => outcome,
            Err(error) => {
                log_failure(&error);
                HandleOutcome::Failed(error)
            }
        };
        info!(outcome = outcome.label(), "Event handled");
        outcome
    }

    async fn route(&self, event: InboundEvent) -> Result<HandleOutcome, RouterError> {
        match event {
            InboundEvent::WorkflowRunCompleted(run) => self.on_workflow_run_completed(run).await,
            InboundEvent::PullRequestOpened(pr) => self.on_pull_request_opened(pr).await,
            InboundEvent::IssueCommentCreated(comment) => self.on_comment_created(comment).await,
        }
    }

    // -----------------------------------------------------------------------
    // workflow_run.completed
    // -----------------------------------------------------------------------

    async fn on_workflow_run_completed(
        &self,
        run: WorkflowRunCompleted,
    ) -> Result<HandleOutcome, RouterError> {
        let token = match CorrelationToken::decode(&run.run_name) {
            Ok(token) => token,
            Err(CorrelationError::UnknownEventType(kind)) => {
                debug!(run_name = %run.run_name, kind = %kind, "Run was not dispatched by the bridge");
                return Ok(HandleOutcome::Ignored(IgnoreReason::UnrelatedWorkflowRun));
            }
            Err(source) => {
                return Err(RouterError::MalformedCorrelation {
                    run_name: run.run_name,
                    source,
                })
            }
        };

        info!(
            conclusion = %run.conclusion,
            token = %token,
            "Workflow run completed"
        );

        let api = self.connector.connect(run.installation).await?;
        match token {
            CorrelationToken::Comment {
                repository,
                comment_id,
            } => {
                let original = api.get_comment(&repository, comment_id).await?;
                let body = self.result_comment_update(&original, &run);
                api.update_comment(&repository, comment_id, &body).await?;
                Ok(HandleOutcome::CommentUpdated {
                    repository,
                    comment_id,
                })
            }
            CorrelationToken::PullRequest {
                requested_by,
                repo,
                number,
            } => {
                let repository = RepositoryRef::new(run.repository.owner.clone(), repo);
                let body = format!(
                    "CI-result: {} {} @{}",
                    run.conclusion, run.html_url, requested_by
                );
                let comment_id = api.create_comment(&repository, number, &body).await?;
                Ok(HandleOutcome::CommentCreated {
                    repository,
                    issue_number: number,
                    comment_id,
                })
            }
        }
    }

    /// The original body with the keyword neutralised, followed by the result
    /// line.
    fn result_comment_update(&self, original: &IssueComment, run: &WorkflowRunCompleted) -> String {
        format!(
            "{}\nCI-result: {} {} @{}",
            self.trigger.neutralise(&original.body),
            run.conclusion,
            run.html_url,
            original.author
        )
    }

    // -----------------------------------------------------------------------
    // pull_request.opened
    // -----------------------------------------------------------------------

    async fn on_pull_request_opened(
        &self,
        pr: PullRequestOpened,
    ) -> Result<HandleOutcome, RouterError> {
        if !self.trigger.title_requests_ci(&pr.title) {
            debug!(number = %pr.number, "Pull request title has no trigger keyword");
            return Ok(HandleOutcome::Ignored(IgnoreReason::TitleWithoutTrigger));
        }

        let token = CorrelationToken::PullRequest {
            requested_by: pr.author,
            repo: pr.repository.name.clone(),
            number: pr.number,
        };
        self.dispatch(pr.installation, pr.repository, pr.head_ref, token)
            .await
    }

    // -----------------------------------------------------------------------
    // issue_comment.created
    // -----------------------------------------------------------------------

    async fn on_comment_created(
        &self,
        comment: IssueCommentCreated,
    ) -> Result<HandleOutcome, RouterError> {
        let Some(branch) = self.trigger.comment_branch(&comment.body) else {
            debug!(comment_id = %comment.comment_id, "Comment has no trigger keyword");
            return Ok(HandleOutcome::Ignored(IgnoreReason::CommentWithoutTrigger));
        };

        let token = CorrelationToken::Comment {
            repository: comment.repository.clone(),
            comment_id: comment.comment_id,
        };
        self.dispatch(comment.installation, comment.repository, branch, token)
            .await
    }

    async fn dispatch(
        &self,
        installation: Option<InstallationId>,
        repository: RepositoryRef,
        git_ref: BranchName,
        token: CorrelationToken,
    ) -> Result<HandleOutcome, RouterError> {
        let dispatch = WorkflowDispatch {
            repository,
            workflow: self.workflow.clone(),
            git_ref,
            inputs: token.to_dispatch_inputs(),
        };

        let api = self.connector.connect(installation).await?;
        api.dispatch_workflow(&dispatch).await?;
        info!(
            workflow = %dispatch.workflow,
            git_ref = %dispatch.git_ref,
            event_type = token.event_type(),
            "Workflow dispatched"
        );

        Ok(HandleOutcome::Dispatched {
            repository: dispatch.repository,
            git_ref: dispatch.git_ref,
            token,
        })
    }
}

#[async_trait]
impl EventHandler for EventRouter {
    async fn handle(&self, event: InboundEvent) -> HandleOutcome {
        EventRouter::handle(self, event).await
    }
}

fn log_failure(error: &RouterError) {
    if let Some((status, message)) = error.upstream_response() {
        error!(status, github_message = message, "GitHub request failed");
    }
    match error.retry_policy() {
        RetryPolicy::Retryable { after } => {
            warn!(error = %error, retry_after = ?after, "Event handling failed; redelivery may succeed");
        }
        RetryPolicy::NonRetryable => {
            error!(error = %error, "Event handling failed");
        }
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
