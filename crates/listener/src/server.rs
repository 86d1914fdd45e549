//! HTTP server lifecycle.

use std::future::Future;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

/// Server startup and runtime failures.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The listen address could not be bound.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    /// The server stopped with an I/O error.
    #[error("webhook server failed: {0}")]
    Serve(#[source] std::io::Error),
}

/// Binds `address` and serves `router` until `shutdown` resolves.
///
/// In-flight HTTP requests are allowed to finish. Handler tasks spawned for
/// accepted deliveries are not awaited here; pass their tracker to [`drain`].
pub async fn serve<F>(address: &str, router: Router, shutdown: F) -> Result<(), ListenerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(address)
        .await
        .map_err(|source| ListenerError::Bind {
            address: address.to_string(),
            source,
        })?;

    match listener.local_addr() {
        Ok(local) => info!(address = %local, "Server is listening for webhook deliveries"),
        Err(_) => info!(address, "Server is listening for webhook deliveries"),
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ListenerError::Serve)?;

    info!("Server shutdown complete");
    Ok(())
}

/// Closes the tracker and waits up to `timeout` for the handler tasks still
/// running. Returns `false` if some were still running at the deadline.
pub async fn drain(deliveries: &TaskTracker, timeout: Duration) -> bool {
    deliveries.close();
    if deliveries.is_empty() {
        return true;
    }

    info!(pending = deliveries.len(), "Waiting for accepted deliveries to finish");
    match tokio::time::timeout(timeout, deliveries.wait()).await {
        Ok(()) => {
            info!("All accepted deliveries finished");
            true
        }
        Err(_) => {
            warn!(
                pending = deliveries.len(),
                timeout_secs = timeout.as_secs(),
                "Shutdown deadline reached with deliveries still running"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn unbindable_address_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = taken.local_addr().unwrap().to_string();

        let err = serve(&address, Router::new(), async {})
            .await
            .unwrap_err();
        assert!(matches!(err, ListenerError::Bind { .. }));
    }

    #[tokio::test]
    async fn resolved_shutdown_stops_the_server() {
        serve("127.0.0.1:0", Router::new(), async {}).await.unwrap();
    }

    #[tokio::test]
    async fn drain_waits_for_running_deliveries() {
        let deliveries = TaskTracker::new();
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();
        deliveries.spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            flag.store(true, Ordering::SeqCst);
        });

        assert!(drain(&deliveries, Duration::from_secs(5)).await);
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn drain_gives_up_at_the_deadline() {
        let deliveries = TaskTracker::new();
        deliveries.spawn(std::future::pending::<()>());

        assert!(!drain(&deliveries, Duration::from_millis(20)).await);
    }

    #[tokio::test]
    async fn drain_with_nothing_running_returns_immediately() {
        assert!(drain(&TaskTracker::new(), Duration::from_millis(1)).await);
    }
}
