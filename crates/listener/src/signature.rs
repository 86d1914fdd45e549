//! HMAC-SHA256 webhook signatures.
//!
//! GitHub signs every delivery with the shared webhook secret and sends the
//! result as `X-Hub-Signature-256: sha256=<hex>`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Prefix of the `X-Hub-Signature-256` header value.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// The shared webhook secret. Never printed.
#[derive(Clone)]
pub struct WebhookSecret(String);

impl WebhookSecret {
    /// Wraps a secret, returning `None` if it is empty.
    pub fn new(secret: impl Into<String>) -> Option<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            None
        } else {
            Some(Self(secret))
        }
    }

    fn mac(&self) -> Result<HmacSha256, SignatureError> {
        HmacSha256::new_from_slice(self.0.as_bytes()).map_err(|_| SignatureError::InvalidKey)
    }
}

impl std::fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WebhookSecret(<redacted>)")
    }
}

/// Why a signature was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// The header is not `sha256=<hex>`.
    #[error("signature header is not of the form 'sha256=<hex>'")]
    Malformed,
    /// The signature does not match the payload.
    #[error("signature does not match payload")]
    Mismatch,
    /// The secret cannot key an HMAC.
    #[error("webhook secret cannot be used as an HMAC key")]
    InvalidKey,
}

/// Computes the `X-Hub-Signature-256` header value for `payload`.
pub fn sign(secret: &WebhookSecret, payload: &[u8]) -> Result<String, SignatureError> {
    let mut mac = secret.mac()?;
    mac.update(payload);
    Ok(format!(
        "{SIGNATURE_PREFIX}{}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Verifies `header` against `payload` in constant time.
pub fn verify(secret: &WebhookSecret, payload: &[u8], header: &str) -> Result<(), SignatureError> {
    let hex_signature = header
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or(SignatureError::Malformed)?;
    let expected = hex::decode(hex_signature).map_err(|_| SignatureError::Malformed)?;

    let mut mac = secret.mac()?;
    mac.update(payload);
    mac.verify_slice(&expected)
        .map_err(|_| SignatureError::Mismatch)
}
