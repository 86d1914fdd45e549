//! Top-level error and retry-policy types for the routing domain.
//!
//! [`RouterError`] covers every way handling a single delivery can fail.
//! Infrastructure crates convert their own error types into it at the port
//! boundary so the router can classify failures without knowing about HTTP
//! clients.
//!
//! [`RetryPolicy`] records whether a failure would be safe to retry. The bridge
//! attempts every call exactly once; the policy is reported in the failure log
//! so an operator can decide whether to redeliver the webhook by hand.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::correlation::CorrelationError;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// Redelivering the webhook may succeed.
    Retryable {
        /// Minimum back-off before the next attempt, when the upstream said
        /// so (`Retry-After`).
        after: Option<Duration>,
    },
    /// Redelivering the webhook will fail the same way.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Router errors
// ---------------------------------------------------------------------------

/// Failures while handling one webhook delivery.
///
/// All variants are terminal for the delivery: nothing is retried, and the
/// webhook sender has already been acknowledged.
#[derive(Debug, Error)]
pub enum RouterError {
    /// The request never produced an HTTP response (DNS, connect, TLS,
    /// timeout, or an unreadable response body).
    #[error("Transport error: {message}")]
    Transport {
        /// Description from the HTTP client.
        message: String,
    },

    /// A workflow run name looked like a correlation token but could not be
    /// decoded.
    #[error("Malformed correlation token '{run_name}': {source}")]
    MalformedCorrelation {
        /// The run name as received.
        run_name: String,
        /// Why decoding failed.
        #[source]
        source: CorrelationError,
    },

    /// GitHub rejected the request (4xx).
    #[error("GitHub rejected the request: status {status}, message: {message}")]
    UpstreamClient {
        /// HTTP status code.
        status: u16,
        /// `message` field of the GitHub error body, or the raw body.
        message: String,
    },

    /// GitHub failed to serve the request (5xx).
    #[error("GitHub server error: status {status}, message: {message}")]
    UpstreamServer {
        /// HTTP status code.
        status: u16,
        /// `message` field of the GitHub error body, or the raw body.
        message: String,
        /// Back-off suggested by `Retry-After`, if any.
        retry_after: Option<Duration>,
    },

    /// An installation token could not be obtained or signed.
    #[error("GitHub App authentication failed: {message}")]
    Authentication {
        /// Description of the failure.
        message: String,
    },

    /// The delivery carried no installation id, so there is no identity to
    /// act as.
    #[error("Event carries no GitHub App installation")]
    MissingInstallation,

    /// The router or one of its collaborators was configured incorrectly.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },
}

impl RouterError {
    /// Returns the retry classification for this error.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Transport { .. } => RetryPolicy::Retryable { after: None },
            Self::UpstreamServer { retry_after, .. } => RetryPolicy::Retryable {
                after: *retry_after,
            },
            Self::UpstreamClient { status, .. } if *status == 429 => {
                RetryPolicy::Retryable { after: None }
            }
            Self::MalformedCorrelation { .. }
            | Self::UpstreamClient { .. }
            | Self::Authentication { .. }
            | Self::MissingInstallation
            | Self::Configuration { .. } => RetryPolicy::NonRetryable,
        }
    }

    /// HTTP status and message when the failure carries a GitHub response.
    pub fn upstream_response(&self) -> Option<(u16, &str)> {
        match self {
            Self::UpstreamClient { status, message }
            | Self::UpstreamServer {
                status, message, ..
            } => Some((*status, message.as_str())),
            _ => None,
        }
    }

    /// Builds the upstream variant matching `status`.
    pub fn from_status(status: u16, message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        let message = message.into();
        if status >= 500 {
            Self::UpstreamServer {
                status,
                message,
                retry_after,
            }
        } else {
            Self::UpstreamClient { status, message }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_class_selects_variant() {
        assert!(matches!(
            RouterError::from_status(404, "Not Found", None),
            RouterError::UpstreamClient { status: 404, .. }
        ));
        assert!(matches!(
            RouterError::from_status(502, "Bad Gateway", None),
            RouterError::UpstreamServer { status: 502, .. }
        ));
    }

    #[test]
    fn server_and_transport_errors_are_retryable() {
        let after = Some(Duration::from_secs(30));
        assert_eq!(
            RouterError::from_status(503, "unavailable", after).retry_policy(),
            RetryPolicy::Retryable { after }
        );
        assert_eq!(
            RouterError::Transport {
                message: "connection reset".into()
            }
            .retry_policy(),
            RetryPolicy::Retryable { after: None }
        );
    }

    #[test]
    fn client_and_correlation_errors_are_not_retryable() {
        assert_eq!(
            RouterError::from_status(422, "Unprocessable", None).retry_policy(),
            RetryPolicy::NonRetryable
        );
        let err = RouterError::MalformedCorrelation {
            run_name: "CI".into(),
            source: CorrelationError::FieldCount { found: 1 },
        };
        assert_eq!(err.retry_policy(), RetryPolicy::NonRetryable);
        assert!(err.upstream_response().is_none());
    }

    #[test]
    fn upstream_response_exposes_status_and_message() {
        let err = RouterError::from_status(404, "Not Found", None);
        assert_eq!(err.upstream_response(), Some((404, "Not Found")));
    }
}
