//! Webhook receiver: HTTP intake, verification, and hand-off to the router.
//!
//! # Fire-and-Forget Pattern
//!
//! 1. Extract headers and the raw body.
//! 2. Verify the signature against the raw body.
//! 3. Decode the payload into an [`InboundEvent`].
//! 4. Spawn the handler and return `202 Accepted` immediately.
//!
//! GitHub times out deliveries after ten seconds; the handler's REST calls
//! never count against that budget, and its outcome never changes the
//! response. Handler tasks are spawned on a [`TaskTracker`] owned by the
//! caller, which waits on it at shutdown (see [`crate::server::drain`]).

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio_util::task::TaskTracker;
use tracing::{error, info, info_span, warn, Instrument};

use routing::{EventHandler, InboundEvent};

use crate::payload::decode_event;
use crate::signature::{verify, WebhookSecret};

/// Default delivery path.
pub const DEFAULT_WEBHOOK_PATH: &str = "/api/webhook";

/// Largest delivery GitHub sends (25 MB).
pub const MAX_PAYLOAD_BYTES: usize = 25 * 1024 * 1024;

const EVENT_HEADER: &str = "x-github-event";
const DELIVERY_HEADER: &str = "x-github-delivery";
const SIGNATURE_HEADER: &str = "x-hub-signature-256";

// ============================================================================
// Response type
// ============================================================================

/// Immediate HTTP response to a delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WebhookResponse {
    /// `202`: verified and handed to the router.
    Accepted { delivery_id: Option<String> },
    /// `200`: verified, but not an event the router handles.
    Ignored { delivery_id: Option<String> },
    /// `401`: missing or invalid signature.
    Unauthorized { message: String },
    /// `400`: missing headers or undecodable payload.
    BadRequest { message: String },
    /// `500`: verification could not run.
    InternalError { message: String },
}

impl WebhookResponse {
    /// HTTP status for this response.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Accepted { .. } => StatusCode::ACCEPTED,
            Self::Ignored { .. } => StatusCode::OK,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebhookResponse {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

// ============================================================================
// Router
// ============================================================================

/// Settings for [`webhook_router`].
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Path deliveries are POSTed to.
    pub path: String,
    /// Shared webhook secret.
    pub secret: WebhookSecret,
}

#[derive(Clone)]
struct ReceiverState {
    secret: Arc<WebhookSecret>,
    handler: Arc<dyn EventHandler>,
    deliveries: TaskTracker,
}

/// Builds the axum router: `POST {path}` for deliveries and `GET /health`.
///
/// Accepted deliveries run on `deliveries`; close and wait on it after the
/// server stops so acknowledged work is not cut off.
pub fn webhook_router(
    config: WebhookConfig,
    handler: Arc<dyn EventHandler>,
    deliveries: TaskTracker,
) -> Router {
    let state = ReceiverState {
        secret: Arc::new(config.secret),
        handler,
        deliveries,
    };

    Router::new()
        .route(&config.path, post(receive_webhook))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_PAYLOAD_BYTES))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

async fn receive_webhook(
    State(state): State<ReceiverState>,
    headers: HeaderMap,
    body: Bytes,
) -> WebhookResponse {
    let delivery_id = header(&headers, DELIVERY_HEADER).map(str::to_string);

    let Some(event_type) = header(&headers, EVENT_HEADER) else {
        return WebhookResponse::BadRequest {
            message: "Missing X-GitHub-Event header".to_string(),
        };
    };

    let Some(signature) = header(&headers, SIGNATURE_HEADER) else {
        warn!(event_type, delivery_id = ?delivery_id, "Delivery without signature");
        return WebhookResponse::Unauthorized {
            message: "Missing X-Hub-Signature-256 header".to_string(),
        };
    };

    if let Err(e) = verify(&state.secret, &body, signature) {
        if matches!(e, crate::signature::SignatureError::InvalidKey) {
            error!(error = %e, "Signature verification could not run");
            return WebhookResponse::InternalError {
                message: "Signature verification failed".to_string(),
            };
        }
        warn!(event_type, delivery_id = ?delivery_id, error = %e, "Invalid webhook signature");
        return WebhookResponse::Unauthorized {
            message: "Invalid signature".to_string(),
        };
    }

    let event = match decode_event(event_type, &body) {
        Ok(Some(event)) => event,
        Ok(None) => {
            info!(event_type, delivery_id = ?delivery_id, "Delivery ignored");
            return WebhookResponse::Ignored { delivery_id };
        }
        Err(e) => {
            error!(event_type, delivery_id = ?delivery_id, error = %e, "Undecodable delivery");
            return WebhookResponse::BadRequest {
                message: format!("Invalid webhook payload: {e}"),
            };
        }
    };

    info!(
        event = event.kind(),
        delivery_id = ?delivery_id,
        repository = %event.repository(),
        "Webhook accepted"
    );
    dispatch(&state.deliveries, state.handler, event, delivery_id.clone());

    WebhookResponse::Accepted { delivery_id }
}

/// Runs the handler detached from the HTTP response.
fn dispatch(
    deliveries: &TaskTracker,
    handler: Arc<dyn EventHandler>,
    event: InboundEvent,
    delivery_id: Option<String>,
) {
    let span = info_span!("delivery", delivery_id = delivery_id.as_deref().unwrap_or("-"));
    deliveries.spawn(
        async move {
            handler.handle(event).await;
        }
        .instrument(span),
    );
}

#[cfg(test)]
#[path = "receiver_tests.rs"]
mod tests;
