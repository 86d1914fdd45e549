//! Decoding of raw GitHub webhook JSON into [`routing::InboundEvent`].
//!
//! Only the fields the router uses are modelled; everything else in the
//! payload is ignored by serde.

use serde::Deserialize;
use thiserror::Error;

use routing::correlation::FIELD_DELIMITER;
use routing::{
    BranchName, CommentId, Conclusion, InboundEvent, InstallationId, IssueCommentCreated,
    IssueNumber, OwnerLogin, PullRequestOpened, RepositoryName, RepositoryRef, UserLogin,
    WorkflowRunCompleted,
};

/// Why a delivery body could not be decoded.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The body is not valid JSON of the expected shape.
    #[error("invalid {event} payload: {source}")]
    Json {
        event: String,
        #[source]
        source: serde_json::Error,
    },
    /// A field the router relies on was empty.
    #[error("payload field '{0}' is empty")]
    EmptyField(&'static str),
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct Envelope {
    action: Option<String>,
}

#[derive(Deserialize)]
struct RawAccount {
    login: String,
}

#[derive(Deserialize)]
struct RawRepository {
    name: String,
    owner: RawAccount,
}

#[derive(Deserialize)]
struct RawInstallation {
    id: u64,
}

#[derive(Deserialize)]
struct WorkflowRunPayload {
    repository: RawRepository,
    installation: Option<RawInstallation>,
    workflow_run: RawWorkflowRun,
}

#[derive(Deserialize)]
struct RawWorkflowRun {
    name: Option<String>,
    display_title: Option<String>,
    conclusion: Option<String>,
    html_url: String,
}

#[derive(Deserialize)]
struct PullRequestPayload {
    repository: RawRepository,
    installation: Option<RawInstallation>,
    pull_request: RawPullRequest,
}

#[derive(Deserialize)]
struct RawPullRequest {
    number: u64,
    title: String,
    user: RawAccount,
    head: RawHead,
}

#[derive(Deserialize)]
struct RawHead {
    #[serde(rename = "ref")]
    git_ref: String,
}

#[derive(Deserialize)]
struct IssueCommentPayload {
    repository: RawRepository,
    installation: Option<RawInstallation>,
    issue: RawIssue,
    comment: RawComment,
}

#[derive(Deserialize)]
struct RawIssue {
    number: u64,
}

#[derive(Deserialize)]
struct RawComment {
    id: u64,
    body: Option<String>,
    user: RawAccount,
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decodes a delivery of type `event` (the `X-GitHub-Event` header).
///
/// Returns `Ok(None)` for event/action pairs the router does not handle.
pub fn decode_event(event: &str, body: &[u8]) -> Result<Option<InboundEvent>, PayloadError> {
    let envelope: Envelope = parse(event, body)?;
    let action = envelope.action.as_deref().unwrap_or_default();

    let decoded = match (event, action) {
        ("workflow_run", "completed") => {
            InboundEvent::WorkflowRunCompleted(workflow_run(parse(event, body)?)?)
        }
        ("pull_request", "opened") => {
            InboundEvent::PullRequestOpened(pull_request(parse(event, body)?)?)
        }
        ("issue_comment", "created") => {
            InboundEvent::IssueCommentCreated(issue_comment(parse(event, body)?)?)
        }
        _ => return Ok(None),
    };
    Ok(Some(decoded))
}

fn parse<'a, T: Deserialize<'a>>(event: &str, body: &'a [u8]) -> Result<T, PayloadError> {
    serde_json::from_slice(body).map_err(|source| PayloadError::Json {
        event: event.to_string(),
        source,
    })
}

fn repository(raw: RawRepository) -> Result<RepositoryRef, PayloadError> {
    let owner = OwnerLogin::new(raw.owner.login)
        .ok_or(PayloadError::EmptyField("repository.owner.login"))?;
    let name = RepositoryName::new(raw.name).ok_or(PayloadError::EmptyField("repository.name"))?;
    Ok(RepositoryRef::new(owner, name))
}

fn installation(raw: Option<RawInstallation>) -> Option<InstallationId> {
    raw.map(|i| InstallationId::new(i.id))
}

fn workflow_run(payload: WorkflowRunPayload) -> Result<WorkflowRunCompleted, PayloadError> {
    let run = payload.workflow_run;
    Ok(WorkflowRunCompleted {
        repository: repository(payload.repository)?,
        installation: installation(payload.installation),
        run_name: run_name(run.display_title, run.name),
        conclusion: Conclusion::new(run.conclusion),
        html_url: run.html_url,
    })
}

/// A workflow's `run-name` is reported as `display_title`; `name` is the
/// workflow's own name. Whichever carries a correlation token wins, with
/// `display_title` preferred.
fn run_name(display_title: Option<String>, name: Option<String>) -> String {
    let candidates = [display_title, name];
    candidates
        .iter()
        .flatten()
        .find(|n| n.contains(FIELD_DELIMITER))
        .or_else(|| candidates.iter().flatten().next())
        .cloned()
        .unwrap_or_default()
}

fn pull_request(payload: PullRequestPayload) -> Result<PullRequestOpened, PayloadError> {
    let pr = payload.pull_request;
    Ok(PullRequestOpened {
        repository: repository(payload.repository)?,
        installation: installation(payload.installation),
        number: IssueNumber::new(pr.number),
        title: pr.title,
        author: UserLogin::new(pr.user.login)
            .ok_or(PayloadError::EmptyField("pull_request.user.login"))?,
        head_ref: BranchName::new(pr.head.git_ref)
            .ok_or(PayloadError::EmptyField("pull_request.head.ref"))?,
    })
}

fn issue_comment(payload: IssueCommentPayload) -> Result<IssueCommentCreated, PayloadError> {
    let comment = payload.comment;
    Ok(IssueCommentCreated {
        repository: repository(payload.repository)?,
        installation: installation(payload.installation),
        comment_id: CommentId::new(comment.id),
        issue_number: IssueNumber::new(payload.issue.number),
        body: comment.body.unwrap_or_default(),
        author: UserLogin::new(comment.user.login)
            .ok_or(PayloadError::EmptyField("comment.user.login"))?,
    })
}
