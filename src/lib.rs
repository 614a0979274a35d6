//! Networking, logging and signal helpers.
//!
//! - [`http::graceful`] serves until a cancellation token fires, then shuts
//!   down within a bound
//! - [`lifecycle::signals`] turns OS signals into a cancellation token
//! - [`net::scanner`] exposes a listener's accept loop as scan/conn/err
//! - [`observability::logging`] is a verbosity-gated logging facade

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::AppConfig;
pub use http::{GracefulServer, HttpServer};
pub use lifecycle::{with_signals, SignalContext};
pub use net::Scanner;
