//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Bound listener (TCP, Unix, TLS)
//!     → scanner.rs (scan → conn → err, first error wins)
//!     → tls.rs (PEM material for TLS listeners)
//!     → caller handles each connection
//! ```

pub mod scanner;
pub mod tls;

#[cfg(unix)]
pub use scanner::scan_unix;
pub use scanner::{scan_net, scan_tls, Accept, ScanError, Scanner, TlsConn, TlsListener};
pub use tls::load_tls_config;
