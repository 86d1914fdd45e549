//! Correlation token codec.
//!
//! GitHub reports only a conclusion and a run id when a workflow run completes;
//! it does not echo caller-supplied metadata. The dispatched workflow therefore
//! sets its `run-name` from its inputs:
//!
//! ```yaml
//! run-name: ${{ inputs.owner }}|${{ inputs.repo }}|${{ inputs.comment_id }}|${{ inputs.event_type }}
//! ```
//!
//! and the completion handler decodes that name back into a
//! [`CorrelationToken`].
//!
//! ## Escaping
//!
//! The workflow joins the inputs verbatim, so each field is escaped before it
//! becomes an input: `%` is written as `%25` and `|` as `%7C`. After escaping,
//! splitting on `|` always yields exactly the four original fields. Tokens
//! produced without escaping decode unchanged as long as they contain no `%`.

use thiserror::Error;

use crate::{
    CommentId, DispatchInputs, IssueNumber, OwnerLogin, RepositoryName, RepositoryRef, UserLogin,
};

/// Separator between token fields.
pub const FIELD_DELIMITER: char = '|';

const EVENT_TYPE_COMMENT: &str = "comment";
const EVENT_TYPE_PULL_REQUEST: &str = "pull_request";

/// Routing metadata carried through a workflow run's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrelationToken {
    /// The run was triggered by an issue comment; the comment is updated in
    /// place when the run completes.
    Comment {
        /// Repository holding the comment.
        repository: RepositoryRef,
        /// The triggering comment.
        comment_id: CommentId,
    },
    /// The run was triggered by opening a pull request; a new comment is
    /// posted on the pull request when the run completes.
    PullRequest {
        /// Author of the pull request (travels in the `owner` slot).
        requested_by: UserLogin,
        /// Repository name.
        repo: RepositoryName,
        /// Pull request number (travels in the `comment_id` slot).
        number: IssueNumber,
    },
}

/// Reasons a run name cannot be decoded into a [`CorrelationToken`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelationError {
    /// The name did not split into exactly four fields.
    #[error("expected 4 '|'-separated fields, found {found}")]
    FieldCount {
        /// Number of fields actually present.
        found: usize,
    },

    /// A required field was empty.
    #[error("correlation field '{field}' is empty")]
    EmptyField {
        /// Field name.
        field: &'static str,
    },

    /// The id slot was not an unsigned integer.
    #[error("correlation field '{field}' is not an integer: '{value}'")]
    InvalidId {
        /// Field name.
        field: &'static str,
        /// The offending raw value.
        value: String,
    },

    /// A `%` was not followed by a recognised escape.
    #[error("invalid escape sequence in '{value}'")]
    InvalidEscape {
        /// The offending raw value.
        value: String,
    },

    /// The event type slot named something other than `comment` or
    /// `pull_request`. Runs not started by this bridge land here.
    #[error("unknown correlation event type '{0}'")]
    UnknownEventType(String),
}

impl CorrelationToken {
    /// The `event_type` string for this token.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Comment { .. } => EVENT_TYPE_COMMENT,
            Self::PullRequest { .. } => EVENT_TYPE_PULL_REQUEST,
        }
    }

    /// The escaped workflow inputs that encode this token.
    pub fn to_dispatch_inputs(&self) -> DispatchInputs {
        let (owner, repo, id) = match self {
            Self::Comment {
                repository,
                comment_id,
            } => (
                repository.owner.as_str(),
                repository.name.as_str(),
                comment_id.as_u64(),
            ),
            Self::PullRequest {
                requested_by,
                repo,
                number,
            } => (requested_by.as_str(), repo.as_str(), number.as_u64()),
        };

        DispatchInputs {
            owner: escape_field(owner),
            repo: escape_field(repo),
            comment_id: id.to_string(),
            event_type: self.event_type().to_string(),
        }
    }

    /// The run name the workflow produces from [`Self::to_dispatch_inputs`].
    pub fn to_run_name(&self) -> String {
        let inputs = self.to_dispatch_inputs();
        [
            inputs.owner,
            inputs.repo,
            inputs.comment_id,
            inputs.event_type,
        ]
        .join("|")
    }

    /// Decodes a workflow run name.
    pub fn decode(run_name: &str) -> Result<Self, CorrelationError> {
        let fields: Vec<&str> = run_name.split(FIELD_DELIMITER).collect();

        // The kind is checked before anything else so that runs unrelated to
        // the bridge (`CI`, a commit title) are reported as such rather than
        // as malformed tokens.
        let last = fields.last().copied().unwrap_or_default();
        let event_type = unescape_field(last).unwrap_or_else(|_| last.to_string());
        if event_type != EVENT_TYPE_COMMENT && event_type != EVENT_TYPE_PULL_REQUEST {
            return Err(CorrelationError::UnknownEventType(event_type));
        }

        let [owner, repo, id, _] = fields.as_slice() else {
            return Err(CorrelationError::FieldCount {
                found: fields.len(),
            });
        };

        let owner = unescape_field(owner)?;
        let repo = RepositoryName::new(unescape_field(repo)?)
            .ok_or(CorrelationError::EmptyField { field: "repo" })?;
        let id = id
            .parse::<u64>()
            .map_err(|_| CorrelationError::InvalidId {
                field: "comment_id",
                value: (*id).to_string(),
            })?;

        if event_type == EVENT_TYPE_COMMENT {
            let owner =
                OwnerLogin::new(owner).ok_or(CorrelationError::EmptyField { field: "owner" })?;
            Ok(Self::Comment {
                repository: RepositoryRef::new(owner, repo),
                comment_id: CommentId::new(id),
            })
        } else {
            let requested_by =
                UserLogin::new(owner).ok_or(CorrelationError::EmptyField { field: "owner" })?;
            Ok(Self::PullRequest {
                requested_by,
                repo,
                number: IssueNumber::new(id),
            })
        }
    }
}

impl std::fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_run_name())
    }
}

// ---------------------------------------------------------------------------
// Field escaping
// ---------------------------------------------------------------------------

fn escape_field(value: &str) -> String {
    value.replace('%', "%25").replace(FIELD_DELIMITER, "%7C")
}

fn unescape_field(value: &str) -> Result<String, CorrelationError> {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let escape = rest.get(pos + 1..pos + 3);
        match escape {
            Some("25") => out.push('%'),
            Some("7C") | Some("7c") => out.push(FIELD_DELIMITER),
            _ => {
                return Err(CorrelationError::InvalidEscape {
                    value: value.to_string(),
                })
            }
        }
        rest = &rest[pos + 3..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment_token(owner: &str, repo: &str, id: u64) -> CorrelationToken {
        CorrelationToken::Comment {
            repository: RepositoryRef::new(
                OwnerLogin::new(owner).unwrap(),
                RepositoryName::new(repo).unwrap(),
            ),
            comment_id: CommentId::new(id),
        }
    }

    #[test]
    fn decodes_plain_comment_token() {
        let token = CorrelationToken::decode("octo-org|octo-repo|42|comment").unwrap();
        assert_eq!(token, comment_token("octo-org", "octo-repo", 42));
    }

    #[test]
    fn decodes_plain_pull_request_token() {
        let token = CorrelationToken::decode("mona|octo-repo|7|pull_request").unwrap();
        assert_eq!(
            token,
            CorrelationToken::PullRequest {
                requested_by: UserLogin::new("mona").unwrap(),
                repo: RepositoryName::new("octo-repo").unwrap(),
                number: IssueNumber::new(7),
            }
        );
    }

    #[test]
    fn dispatch_inputs_carry_stringified_fields() {
        let inputs = comment_token("octo-org", "octo-repo", 1849268462).to_dispatch_inputs();
        assert_eq!(inputs.owner, "octo-org");
        assert_eq!(inputs.repo, "octo-repo");
        assert_eq!(inputs.comment_id, "1849268462");
        assert_eq!(inputs.event_type, "comment");
    }

    #[test]
    fn fields_containing_the_delimiter_survive_the_workflow_join() {
        let token = comment_token("we|ird", "100%|repo", 9);
        let run_name = token.to_run_name();
        assert_eq!(run_name, "we%7Cird|100%25%7Crepo|9|comment");
        assert_eq!(CorrelationToken::decode(&run_name).unwrap(), token);
    }

    #[test]
    fn wrong_field_count_with_known_kind_is_malformed() {
        assert_eq!(
            CorrelationToken::decode("b|1|comment"),
            Err(CorrelationError::FieldCount { found: 3 })
        );
        assert_eq!(
            CorrelationToken::decode("a|b|extra|1|pull_request"),
            Err(CorrelationError::FieldCount { found: 5 })
        );
    }

    #[test]
    fn plain_run_names_are_unrelated() {
        assert_eq!(
            CorrelationToken::decode("CI"),
            Err(CorrelationError::UnknownEventType("CI".to_string()))
        );
        assert_eq!(
            CorrelationToken::decode("Bump serde to 1.0.200 (100% safe)"),
            Err(CorrelationError::UnknownEventType(
                "Bump serde to 1.0.200 (100% safe)".to_string()
            ))
        );
        assert!(matches!(
            CorrelationToken::decode("a|b|1|comment|extra"),
            Err(CorrelationError::UnknownEventType(_))
        ));
    }

    #[test]
    fn non_integer_id_is_malformed() {
        let err = CorrelationToken::decode("octo-org|octo-repo|forty-two|comment").unwrap_err();
        assert!(matches!(err, CorrelationError::InvalidId { .. }));
    }

    #[test]
    fn unknown_event_type_is_reported_separately() {
        assert_eq!(
            CorrelationToken::decode("octo-org|octo-repo|42|push"),
            Err(CorrelationError::UnknownEventType("push".to_string()))
        );
    }

    #[test]
    fn empty_owner_is_rejected() {
        assert_eq!(
            CorrelationToken::decode("|octo-repo|42|comment"),
            Err(CorrelationError::EmptyField { field: "owner" })
        );
    }

    #[test]
    fn stray_percent_is_an_invalid_escape() {
        let err = CorrelationToken::decode("octo%org|octo-repo|42|comment").unwrap_err();
        assert!(matches!(err, CorrelationError::InvalidEscape { .. }));
    }
}
