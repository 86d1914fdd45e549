//! cibridge entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Load configuration**: `.env` via `dotenvy`, then flags and environment
//!    via `clap`, validated into [`config::Settings`].
//! 2. **Wire observability**: `tracing-subscriber` with a JSON or pretty
//!    layer, plus an OpenTelemetry OTLP exporter when an endpoint is set.
//! 3. **Construct infrastructure**: a [`github::GitHubClient`] injected into a
//!    [`routing::EventRouter`], which is handed to the webhook receiver.
//! 4. **Serve** until SIGINT or SIGTERM, then drain in-flight requests and
//!    wait (bounded by `SHUTDOWN_TIMEOUT_SECS`) for accepted deliveries.

mod config;
mod observability;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use github::GitHubClient;
use routing::EventRouter;

use crate::config::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal outside development.
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    let _telemetry = observability::init(args.log_format, args.otlp_endpoint.as_deref())?;
    let settings = args.into_settings()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        workflow = %settings.router.workflow,
        api_url = %settings.github.api_url,
        webhook_path = %settings.webhook.path,
        "Starting cibridge"
    );

    let github = GitHubClient::new(settings.github, settings.credentials)
        .context("failed to build GitHub client")?;
    let router = EventRouter::new(Arc::new(github), settings.router)
        .context("failed to build event router")?;
    let deliveries = TaskTracker::new();
    let app = listener::webhook_router(settings.webhook, Arc::new(router), deliveries.clone());

    let served = listener::serve(&settings.bind_address, app, shutdown_signal()).await;
    listener::drain(&deliveries, settings.shutdown_timeout).await;
    served.context("webhook server failed")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, draining in-flight requests");
}
