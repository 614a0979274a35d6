//! OS signal handling.
//!
//! # Responsibilities
//! - Register handlers for a caller-chosen set of signals
//! - Turn the first delivered signal into a fired cancellation token
//! - Record what terminated the context (signal or explicit cancel)
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - The context token is a child of the caller's token
//! - Cancelling or dropping the context stops listening; Tokio keeps the
//!   process-level handler installed, so the default action does not return

use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Signals a context can listen for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Signal {
    #[serde(rename = "SIGINT")]
    Interrupt,
    #[serde(rename = "SIGTERM")]
    Terminate,
    #[serde(rename = "SIGHUP")]
    Hangup,
    #[serde(rename = "SIGQUIT")]
    Quit,
    #[serde(rename = "SIGUSR1")]
    User1,
    #[serde(rename = "SIGUSR2")]
    User2,
}

impl Signal {
    /// Signals used when the caller names none.
    pub const SHUTDOWN: [Signal; 2] = [Signal::Interrupt, Signal::Terminate];

    /// Conventional name, e.g. `SIGINT`.
    pub fn name(&self) -> &'static str {
        match self {
            Signal::Interrupt => "SIGINT",
            Signal::Terminate => "SIGTERM",
            Signal::Hangup => "SIGHUP",
            Signal::Quit => "SIGQUIT",
            Signal::User1 => "SIGUSR1",
            Signal::User2 => "SIGUSR2",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a signal context is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cause {
    /// One of the registered signals was delivered.
    Signal(Signal),
    /// The context or its parent was cancelled.
    Cancelled,
}

/// A cancellation token that also fires on OS signals.
#[derive(Debug)]
pub struct SignalContext {
    token: CancellationToken,
    cause: Arc<OnceLock<Cause>>,
    listener: JoinHandle<()>,
}

impl SignalContext {
    /// Clone of the context's token, for handing to other tasks.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Wait until the context is done.
    pub async fn done(&self) {
        self.token.cancelled().await
    }

    /// Whether the context is done.
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled()
    }

    /// What terminated the context, or `None` while it is live.
    pub fn cause(&self) -> Option<Cause> {
        self.cause
            .get()
            .copied()
            .or_else(|| self.token.is_cancelled().then_some(Cause::Cancelled))
    }

    /// Cancel the context and stop listening for signals.
    pub fn cancel(&self) {
        let _ = self.cause.set(Cause::Cancelled);
        self.token.cancel();
        self.listener.abort();
    }
}

impl Drop for SignalContext {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

/// Derive a context from `parent` that is cancelled when any of `signals`
/// arrives. An empty list means SIGINT and SIGTERM.
///
/// Once registered, a signal no longer runs its default action (such as
/// terminating the process) for the rest of the process lifetime, even after
/// the context is gone.
///
/// Must be called from within a Tokio runtime.
pub fn with_signals(
    parent: &CancellationToken,
    signals: &[Signal],
) -> std::io::Result<SignalContext> {
    let signals: &[Signal] = if signals.is_empty() {
        &Signal::SHUTDOWN
    } else {
        signals
    };

    let token = parent.child_token();
    let cause = Arc::new(OnceLock::new());
    let delivered = platform::listen(signals)?;

    let listener = tokio::spawn({
        let token = token.clone();
        let cause = Arc::clone(&cause);
        async move {
            tokio::select! {
                _ = token.cancelled() => {}
                signal = delivered => {
                    tracing::info!(signal = %signal, "Signal received");
                    let _ = cause.set(Cause::Signal(signal));
                    token.cancel();
                }
            }
        }
    });

    Ok(SignalContext {
        token,
        cause,
        listener,
    })
}

#[cfg(unix)]
mod platform {
    use super::Signal;
    use futures_util::future::{select_all, BoxFuture, FutureExt};
    use tokio::signal::unix::{signal, SignalKind};

    fn kind(sig: Signal) -> SignalKind {
        match sig {
            Signal::Interrupt => SignalKind::interrupt(),
            Signal::Terminate => SignalKind::terminate(),
            Signal::Hangup => SignalKind::hangup(),
            Signal::Quit => SignalKind::quit(),
            Signal::User1 => SignalKind::user_defined1(),
            Signal::User2 => SignalKind::user_defined2(),
        }
    }

    /// Register all handlers up front; the future resolves to the first
    /// signal delivered.
    pub(super) fn listen(signals: &[Signal]) -> std::io::Result<BoxFuture<'static, Signal>> {
        let mut waits = Vec::with_capacity(signals.len());
        for &sig in signals {
            let mut stream = signal(kind(sig))?;
            waits.push(
                async move {
                    if stream.recv().await.is_none() {
                        std::future::pending::<()>().await;
                    }
                    sig
                }
                .boxed(),
            );
        }
        Ok(select_all(waits).map(|(sig, _, _)| sig).boxed())
    }
}

#[cfg(not(unix))]
mod platform {
    use super::Signal;
    use futures_util::future::{BoxFuture, FutureExt};

    pub(super) fn listen(signals: &[Signal]) -> std::io::Result<BoxFuture<'static, Signal>> {
        if let Some(sig) = signals.iter().find(|s| **s != Signal::Interrupt) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                format!("{} is not supported on this platform", sig),
            ));
        }
        Ok(async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
            Signal::Interrupt
        }
        .boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn live_until_cancelled() {
        let ctx = with_signals(&CancellationToken::new(), &[Signal::Hangup]).unwrap();
        assert!(!ctx.is_done());
        assert_eq!(ctx.cause(), None);

        ctx.cancel();
        ctx.done().await;
        assert_eq!(ctx.cause(), Some(Cause::Cancelled));
    }

    #[tokio::test]
    async fn parent_cancel_propagates() {
        let parent = CancellationToken::new();
        let ctx = with_signals(&parent, &[Signal::Hangup]).unwrap();

        parent.cancel();
        ctx.done().await;
        assert_eq!(ctx.cause(), Some(Cause::Cancelled));
    }

    #[test]
    fn signal_names_deserialize() {
        #[derive(Deserialize)]
        struct Wrapper {
            signals: Vec<Signal>,
        }
        let parsed: Wrapper = toml::from_str(r#"signals = ["SIGINT", "SIGUSR2"]"#).unwrap();
        assert_eq!(parsed.signals, vec![Signal::Interrupt, Signal::User2]);
        assert_eq!(Signal::Terminate.to_string(), "SIGTERM");
    }
}
