//! Errors raised by the GitHub REST adapter.

use std::time::Duration;

use routing::RouterError;
use thiserror::Error;

/// Failures talking to the GitHub REST API.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// The request could not be sent or its response could not be read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// GitHub answered with a non-2xx status.
    #[error("GitHub API error: status {status}, message: {message}")]
    Api {
        status: u16,
        message: String,
        retry_after: Option<Duration>,
    },

    /// The App private key could not be parsed as an RSA PEM key.
    #[error("Invalid GitHub App private key: {0}")]
    InvalidPrivateKey(#[source] jsonwebtoken::errors::Error),

    /// Signing the App JWT failed.
    #[error("Failed to sign GitHub App JWT: {0}")]
    Jwt(#[source] jsonwebtoken::errors::Error),

    /// Exchanging the App JWT for an installation token was refused.
    #[error("Installation token request failed: status {status}, message: {message}")]
    TokenExchange {
        status: u16,
        message: String,
        retry_after: Option<Duration>,
    },

    /// A 2xx response body did not have the expected shape.
    #[error("Unexpected GitHub response: {0}")]
    UnexpectedResponse(String),
}

impl From<GitHubError> for RouterError {
    fn from(error: GitHubError) -> Self {
        match error {
            GitHubError::Http(e) => RouterError::Transport {
                message: e.to_string(),
            },
            GitHubError::Api {
                status,
                message,
                retry_after,
            } => RouterError::from_status(status, message, retry_after),
            GitHubError::UnexpectedResponse(message) => RouterError::Transport { message },
            // Outages and rate limits on the token endpoint are transient.
            GitHubError::TokenExchange {
                status,
                message,
                retry_after,
            } if status == 429 || status >= 500 => {
                RouterError::from_status(status, message, retry_after)
            }
            e @ (GitHubError::InvalidPrivateKey(_)
            | GitHubError::Jwt(_)
            | GitHubError::TokenExchange { .. }) => RouterError::Authentication {
                message: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use routing::RetryPolicy;

    use super::*;

    #[test]
    fn api_errors_keep_status_class() {
        let err: RouterError = GitHubError::Api {
            status: 404,
            message: "Not Found".into(),
            retry_after: None,
        }
        .into();
        assert!(matches!(err, RouterError::UpstreamClient { status: 404, .. }));

        let err: RouterError = GitHubError::Api {
            status: 500,
            message: "boom".into(),
            retry_after: None,
        }
        .into();
        assert!(matches!(err, RouterError::UpstreamServer { status: 500, .. }));
    }

    #[test]
    fn token_exchange_failures_are_authentication_errors() {
        let err: RouterError = GitHubError::TokenExchange {
            status: 401,
            message: "A JSON web token could not be decoded".into(),
            retry_after: None,
        }
        .into();
        assert!(matches!(err, RouterError::Authentication { .. }));
        assert_eq!(err.retry_policy(), RetryPolicy::NonRetryable);
    }

    #[test]
    fn token_endpoint_outages_stay_retryable() {
        let err: RouterError = GitHubError::TokenExchange {
            status: 502,
            message: "Bad Gateway".into(),
            retry_after: None,
        }
        .into();
        assert!(matches!(err, RouterError::UpstreamServer { status: 502, .. }));
        assert!(matches!(err.retry_policy(), RetryPolicy::Retryable { .. }));

        let err: RouterError = GitHubError::TokenExchange {
            status: 429,
            message: "rate limited".into(),
            retry_after: Some(Duration::from_secs(30)),
        }
        .into();
        assert!(matches!(err, RouterError::UpstreamClient { status: 429, .. }));
        assert!(matches!(err.retry_policy(), RetryPolicy::Retryable { .. }));
    }
}
