//! GitHub App authentication.
//!
//! A GitHub App authenticates in two steps: it signs a short-lived RS256 JWT
//! with its private key, then exchanges that JWT for an installation access
//! token (`POST /app/installations/{id}/access_tokens`). REST calls on behalf
//! of an installation use the installation token.
//!
//! For local development a static token (personal access token) can be used
//! instead, skipping the exchange.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::error::GitHubError;

/// Clock skew allowance: `iat` is backdated by this much.
const JWT_BACKDATE_SECS: i64 = 60;

/// JWT lifetime. GitHub rejects App JWTs valid for more than ten minutes.
const JWT_LIFETIME_SECS: i64 = 9 * 60;

/// Claims of a GitHub App JWT.
#[derive(Debug, Serialize, Deserialize)]
pub struct AppClaims {
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issuer: the App id.
    pub iss: String,
}

/// An App id and its RSA signing key.
#[derive(Clone)]
pub struct AppCredentials {
    app_id: u64,
    key: EncodingKey,
}

impl AppCredentials {
    /// Parses `pem` (PKCS#1 or PKCS#8 RSA private key) for App `app_id`.
    pub fn from_pem(app_id: u64, pem: &[u8]) -> Result<Self, GitHubError> {
        let key = EncodingKey::from_rsa_pem(pem).map_err(GitHubError::InvalidPrivateKey)?;
        Ok(Self { app_id, key })
    }

    /// The App id.
    pub fn app_id(&self) -> u64 {
        self.app_id
    }

    /// Signs an App JWT valid from `now - 60s` to `now + 9min`.
    pub fn app_jwt(&self, now: DateTime<Utc>) -> Result<String, GitHubError> {
        let claims = AppClaims {
            iat: (now - Duration::seconds(JWT_BACKDATE_SECS)).timestamp(),
            exp: (now + Duration::seconds(JWT_LIFETIME_SECS)).timestamp(),
            iss: self.app_id.to_string(),
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.key).map_err(GitHubError::Jwt)
    }
}

impl std::fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppCredentials")
            .field("app_id", &self.app_id)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// How the client authenticates.
#[derive(Clone)]
pub enum Credentials {
    /// GitHub App: one installation token is minted per delivery.
    App(AppCredentials),
    /// A fixed bearer token used for every call.
    Token(String),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::App(app) => f.debug_tuple("App").field(app).finish(),
            Self::Token(_) => f.debug_tuple("Token").field(&"<redacted>").finish(),
        }
    }
}
