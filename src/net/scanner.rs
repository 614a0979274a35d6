//! Iterator-style accept loop over a listener.
//!
//! ```no_run
//! # async fn run() {
//! let mut scanner = netkit::net::scan_net("127.0.0.1:9000").await;
//! while scanner.scan().await {
//!     if let Some((stream, peer)) = scanner.take_conn() {
//!         tokio::spawn(async move { /* handle */ drop((stream, peer)) });
//!     }
//! }
//! if let Some(err) = scanner.err() {
//!     eprintln!("accept loop stopped: {}", err);
//! }
//! # }
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::server::TlsStream;
use tokio_rustls::TlsAcceptor;

/// Error held by a [`Scanner`].
#[derive(Debug, Error)]
pub enum ScanError {
    /// The scanner was built without a listener.
    #[error("nil listener")]
    NilListener,

    /// The listener could not be bound.
    #[error("failed to listen on {address}: {source}")]
    Listen {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// `accept` failed.
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    /// The scanner was closed.
    #[error("listener closed")]
    Closed,
}

/// A listener that yields connections one at a time.
pub trait Accept: Send {
    type Conn: Send;

    /// Wait for the next connection.
    fn accept(&mut self) -> impl Future<Output = std::io::Result<Self::Conn>> + Send;
}

impl Accept for TcpListener {
    type Conn = (TcpStream, SocketAddr);

    fn accept(&mut self) -> impl Future<Output = std::io::Result<Self::Conn>> + Send {
        TcpListener::accept(self)
    }
}

#[cfg(unix)]
impl Accept for tokio::net::UnixListener {
    type Conn = (tokio::net::UnixStream, tokio::net::unix::SocketAddr);

    fn accept(&mut self) -> impl Future<Output = std::io::Result<Self::Conn>> + Send {
        tokio::net::UnixListener::accept(self)
    }
}

/// TCP listener whose connections speak TLS.
pub struct TlsListener {
    inner: TcpListener,
    acceptor: TlsAcceptor,
}

impl TlsListener {
    pub fn new(inner: TcpListener, config: Arc<ServerConfig>) -> Self {
        Self {
            inner,
            acceptor: TlsAcceptor::from(config),
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

/// An accepted TLS connection whose handshake has not run yet.
///
/// Handshakes happen outside the accept loop so a misbehaving client cannot
/// stop the scanner.
pub struct TlsConn {
    handshake: tokio_rustls::Accept<TcpStream>,
    peer: SocketAddr,
}

impl TlsConn {
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Complete the TLS handshake.
    pub async fn handshake(self) -> std::io::Result<TlsStream<TcpStream>> {
        self.handshake.await
    }
}

impl Accept for TlsListener {
    type Conn = TlsConn;

    fn accept(&mut self) -> impl Future<Output = std::io::Result<Self::Conn>> + Send {
        async move {
            let (stream, peer) = self.inner.accept().await?;
            Ok(TlsConn {
                handshake: self.acceptor.accept(stream),
                peer,
            })
        }
    }
}

/// Accept loop exposed as `scan` / `conn` / `err`.
///
/// The first error ends the iteration and is kept; later scans return
/// `false` without touching it.
pub struct Scanner<L: Accept> {
    listener: Option<L>,
    conn: Option<L::Conn>,
    err: Option<ScanError>,
}

impl<L: Accept> Scanner<L> {
    /// Wrap `listener`. `None` yields a scanner that is already failed with
    /// [`ScanError::NilListener`].
    pub fn new(listener: Option<L>) -> Self {
        let err = listener.is_none().then_some(ScanError::NilListener);
        Self {
            listener,
            conn: None,
            err,
        }
    }

    fn failed(err: ScanError) -> Self {
        Self {
            listener: None,
            conn: None,
            err: Some(err),
        }
    }

    /// Advance to the next connection, available through [`Scanner::conn`].
    ///
    /// Returns `false` once the listener is gone or an accept has failed.
    pub async fn scan(&mut self) -> bool {
        if self.err.is_some() {
            return false;
        }
        let Some(listener) = self.listener.as_mut() else {
            self.err = Some(ScanError::Closed);
            return false;
        };

        match listener.accept().await {
            Ok(conn) => {
                self.conn = Some(conn);
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "Accept failed, scanner stopped");
                self.conn = None;
                self.err = Some(ScanError::Accept(e));
                false
            }
        }
    }

    /// The connection accepted by the last successful scan.
    pub fn conn(&self) -> Option<&L::Conn> {
        self.conn.as_ref()
    }

    /// Take ownership of the connection accepted by the last successful scan.
    pub fn take_conn(&mut self) -> Option<L::Conn> {
        self.conn.take()
    }

    /// The first error encountered, if any.
    pub fn err(&self) -> Option<&ScanError> {
        self.err.as_ref()
    }

    pub fn listener(&self) -> Option<&L> {
        self.listener.as_ref()
    }

    /// Drop the underlying listener.
    ///
    /// Leave the scanner alone instead if the listener is closed elsewhere.
    pub fn close(&mut self) {
        self.listener = None;
    }
}

/// Scanner over a freshly bound TCP listener.
pub async fn scan_net(address: &str) -> Scanner<TcpListener> {
    match TcpListener::bind(address).await {
        Ok(listener) => Scanner::new(Some(listener)),
        Err(source) => Scanner::failed(ScanError::Listen {
            address: address.to_string(),
            source,
        }),
    }
}

/// Scanner over a freshly bound Unix domain socket.
#[cfg(unix)]
pub fn scan_unix(path: impl AsRef<std::path::Path>) -> Scanner<tokio::net::UnixListener> {
    let path = path.as_ref();
    match tokio::net::UnixListener::bind(path) {
        Ok(listener) => Scanner::new(Some(listener)),
        Err(source) => Scanner::failed(ScanError::Listen {
            address: path.display().to_string(),
            source,
        }),
    }
}

/// Scanner over a freshly bound TLS listener.
pub async fn scan_tls(address: &str, config: Arc<ServerConfig>) -> Scanner<TlsListener> {
    match TcpListener::bind(address).await {
        Ok(listener) => Scanner::new(Some(TlsListener::new(listener, config))),
        Err(source) => Scanner::failed(ScanError::Listen {
            address: address.to_string(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Listener that replays scripted accept results.
    struct MockListener {
        results: VecDeque<std::io::Result<u32>>,
    }

    impl Accept for MockListener {
        type Conn = u32;

        fn accept(&mut self) -> impl Future<Output = std::io::Result<u32>> + Send {
            let next = self
                .results
                .pop_front()
                .unwrap_or_else(|| Err(std::io::Error::other("exhausted")));
            async move { next }
        }
    }

    #[tokio::test]
    async fn nil_listener() {
        let mut scanner = Scanner::<MockListener>::new(None);
        assert!(matches!(scanner.err(), Some(ScanError::NilListener)));
        assert!(!scanner.scan().await);
        assert!(!scanner.scan().await);
        assert!(matches!(scanner.err(), Some(ScanError::NilListener)));
    }

    #[tokio::test]
    async fn accept_then_fail() {
        let listener = MockListener {
            results: VecDeque::from([Ok(7), Err(std::io::Error::other("testing")), Ok(8)]),
        };
        let mut scanner = Scanner::new(Some(listener));
        assert!(scanner.err().is_none());
        assert!(scanner.listener().is_some());

        assert!(scanner.scan().await);
        assert_eq!(scanner.conn(), Some(&7));
        assert!(scanner.err().is_none());

        assert!(!scanner.scan().await);
        assert_eq!(scanner.conn(), None);
        match scanner.err() {
            Some(ScanError::Accept(e)) => assert_eq!(e.to_string(), "testing"),
            other => panic!("expected accept error, got {:?}", other),
        }

        // First error wins; the queued success is never consumed.
        assert!(!scanner.scan().await);
        assert!(matches!(scanner.err(), Some(ScanError::Accept(e)) if e.to_string() == "testing"));
    }

    #[tokio::test]
    async fn closed_scanner_stops() {
        let listener = MockListener {
            results: VecDeque::from([Ok(1)]),
        };
        let mut scanner = Scanner::new(Some(listener));
        scanner.close();
        assert!(!scanner.scan().await);
        assert!(matches!(scanner.err(), Some(ScanError::Closed)));
    }
}
