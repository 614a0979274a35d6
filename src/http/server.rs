//! axum-backed server handle with graceful shutdown.
//!
//! # Responsibilities
//! - Bind the configured address and serve an axum `Router`
//! - Report `ServeError::Closed` as soon as shutdown is requested
//! - Drain in-flight connections within the shutdown deadline
//! - Provide the echo router used by the binary

use axum::{
    body::Bytes,
    http::{Method, Uri},
    routing::any,
    Router,
};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::http::graceful::{GracefulServer, ServeError, ShutdownError};

/// HTTP server that can be stopped from another task.
pub struct HttpServer {
    address: String,
    router: Router,
    /// Fired once shutdown is requested; stops the accept loop.
    stop: CancellationToken,
    /// Serving tasks that must finish before shutdown completes.
    tasks: TaskTracker,
}

impl HttpServer {
    /// Create a server for `address` that routes requests through `router`.
    pub fn new(address: impl Into<String>, router: Router) -> Self {
        Self {
            address: address.into(),
            router,
            stop: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    /// The configured bind address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Whether shutdown has been requested.
    pub fn is_closed(&self) -> bool {
        self.stop.is_cancelled()
    }
}

impl GracefulServer for HttpServer {
    fn serve(&self) -> impl std::future::Future<Output = Result<(), ServeError>> + Send {
        async move {
            if self.stop.is_cancelled() {
                return Err(ServeError::Closed);
            }

            let listener = TcpListener::bind(&self.address)
                .await
                .map_err(|source| ServeError::Bind {
                    address: self.address.clone(),
                    source,
                })?;
            let local_addr = listener.local_addr()?;

            tracing::info!(address = %local_addr, "HTTP server starting");

            let stop = self.stop.clone();
            let app = self.router.clone();
            let mut task = self.tasks.spawn(async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move { stop.cancelled().await })
                    .await
            });

            tokio::select! {
                _ = self.stop.cancelled() => {
                    tracing::info!(address = %local_addr, "HTTP server closed");
                    Err(ServeError::Closed)
                }
                joined = &mut task => match joined {
                    Ok(Ok(())) => Err(ServeError::Closed),
                    Ok(Err(e)) => {
                        tracing::error!(error = %e, "HTTP server failed");
                        Err(ServeError::Io(e))
                    }
                    Err(e) => Err(ServeError::Other(Box::new(e))),
                },
            }
        }
    }

    fn shutdown(
        &self,
        deadline: Option<Instant>,
    ) -> impl std::future::Future<Output = Result<(), ShutdownError>> + Send {
        async move {
            self.stop.cancel();
            self.tasks.close();

            let drained = self.tasks.wait();
            match deadline {
                Some(deadline) => {
                    tokio::time::timeout_at(deadline, drained)
                        .await
                        .map_err(|_| {
                            tracing::warn!(
                                in_flight = self.tasks.len(),
                                "Shutdown deadline exceeded"
                            );
                            ShutdownError::DeadlineExceeded
                        })?;
                }
                None => drained.await,
            }

            tracing::info!("HTTP server drained");
            Ok(())
        }
    }
}

/// Router that echoes the method, path and body of every request.
#[allow(deprecated)]
pub fn echo_router(request_timeout: Duration) -> Router {
    Router::new()
        .route("/", any(echo_handler))
        .route("/{*path}", any(echo_handler))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}

async fn echo_handler(method: Method, uri: Uri, body: Bytes) -> String {
    tracing::debug!(method = %method, path = %uri.path(), bytes = body.len(), "Echo request");
    format!("{} {}\n{}", method, uri.path(), String::from_utf8_lossy(&body))
}
