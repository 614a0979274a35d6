//! Graceful shutdown coordination for a serving loop.
//!
//! # Responsibilities
//! - Run a server's blocking `serve` call to completion
//! - Watch a cancellation token concurrently and request a bounded shutdown
//! - Reconcile the serve result and the shutdown result into one outcome
//!
//! # Design Decisions
//! - Exactly two activities: `serve` on the caller's task, the watcher spawned
//! - The shutdown result travels through a oneshot channel (write once or drop)
//! - The watcher is aborted when the `graceful` future is dropped
//! - Errors are returned verbatim; the variant records which side failed

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;

use crate::lifecycle::signals::{with_signals, Signal};

/// Error returned by a server's `serve` call.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The server stopped because shutdown was requested. Not a fault.
    #[error("server closed")]
    Closed,

    /// The listener could not be bound.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The serving loop failed after it started.
    #[error("serve failed: {0}")]
    Io(#[from] std::io::Error),

    /// Implementation-specific failure.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl ServeError {
    /// Whether this is the "closed because of shutdown" sentinel.
    pub fn is_closed(&self) -> bool {
        matches!(self, ServeError::Closed)
    }
}

/// Error returned by a server's `shutdown` call.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// In-flight work did not drain before the deadline.
    #[error("shutdown deadline exceeded")]
    DeadlineExceeded,

    /// Implementation-specific failure.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl ShutdownError {
    /// Whether this is a timeout-class error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ShutdownError::DeadlineExceeded)
    }
}

/// Final outcome of a graceful run that did not stop cleanly.
#[derive(Debug, Error)]
pub enum GracefulError {
    #[error(transparent)]
    Serve(#[from] ServeError),

    #[error(transparent)]
    Shutdown(#[from] ShutdownError),

    /// The watcher task ended without reporting a shutdown result.
    #[error("shutdown watcher exited without a result")]
    WatcherLost,
}

/// A server that can be served and gracefully shut down from another task.
///
/// Implementations must tolerate `shutdown` being called while `serve` is
/// running, and must make `shutdown` idempotent.
pub trait GracefulServer: Send + Sync + 'static {
    /// Serve until closed or a fatal error occurs.
    ///
    /// Returns [`ServeError::Closed`] when stopped by [`GracefulServer::shutdown`].
    fn serve(&self) -> impl Future<Output = Result<(), ServeError>> + Send;

    /// Stop accepting new work and wait for in-flight work to finish.
    ///
    /// `None` waits without bound.
    fn shutdown(
        &self,
        deadline: Option<Instant>,
    ) -> impl Future<Output = Result<(), ShutdownError>> + Send;
}

/// Serve `server` until `cancel` fires, then shut it down within `wait`.
///
/// A zero `wait` lets shutdown block until in-flight work drains. A serve
/// error other than [`ServeError::Closed`] is returned as is, whether or not
/// cancellation fired.
pub async fn graceful<S: GracefulServer>(
    cancel: CancellationToken,
    server: Arc<S>,
    wait: Duration,
) -> Result<(), GracefulError> {
    let (result_tx, result_rx) = oneshot::channel();

    let watcher = {
        let server = Arc::clone(&server);
        let cancel = cancel.clone();
        AbortOnDropHandle::new(tokio::spawn(async move {
            cancel.cancelled().await;
            let deadline = (!wait.is_zero()).then(|| Instant::now() + wait);
            tracing::debug!(wait = ?wait, "Cancellation observed, shutting down server");
            let result = server.shutdown(deadline).await;
            // Receiver is gone when serve already failed on its own.
            let _ = result_tx.send(result);
        }))
    };

    match server.serve().await {
        Ok(()) | Err(ServeError::Closed) if cancel.is_cancelled() => match result_rx.await {
            Ok(result) => result.map_err(GracefulError::Shutdown),
            Err(_) => Err(GracefulError::WatcherLost),
        },
        Ok(()) | Err(ServeError::Closed) => {
            // Closed without cancellation: nothing will ever fill the slot.
            watcher.abort();
            Err(GracefulError::Serve(ServeError::Closed))
        }
        Err(e) => {
            watcher.abort();
            Err(GracefulError::Serve(e))
        }
    }
}

/// Serve `server` until one of `signals` is delivered (SIGINT/SIGTERM when
/// empty), then shut it down within `wait`.
pub async fn serve_until_signalled<S: GracefulServer>(
    server: Arc<S>,
    wait: Duration,
    signals: &[Signal],
) -> Result<(), GracefulError> {
    let ctx = with_signals(&CancellationToken::new(), signals).map_err(ServeError::Io)?;
    graceful(ctx.token(), server, wait).await
}
