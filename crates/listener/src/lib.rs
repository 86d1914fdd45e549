//! cibridge webhook event source infrastructure.
//!
//! Binds an HTTP server that receives GitHub webhook deliveries directly (or
//! via smee.io in development), validates the HMAC-SHA256 signature of every
//! request, decodes the payload into a [`routing::InboundEvent`], and hands it
//! to a [`routing::EventHandler`] on a task tracked for shutdown draining.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Transport details, signature verification, and payload
//! deserialization all live here. The [`routing`] crate sees only
//! [`routing::InboundEvent`].
//!
//! ## Responses
//!
//! | Condition | Status |
//! |-----------|--------|
//! | Handled event, handler spawned | 202 |
//! | Valid delivery of an unhandled event or action (incl. `ping`) | 200 |
//! | Missing `X-GitHub-Event` or undecodable payload | 400 |
//! | Missing or invalid `X-Hub-Signature-256` | 401 |

pub mod payload;
pub mod receiver;
pub mod server;
pub mod signature;

pub use payload::{decode_event, PayloadError};
pub use receiver::{
    webhook_router, WebhookConfig, WebhookResponse, DEFAULT_WEBHOOK_PATH, MAX_PAYLOAD_BYTES,
};
pub use server::{drain, serve, ListenerError};
pub use signature::{sign, verify, SignatureError, WebhookSecret};
