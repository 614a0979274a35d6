//! HTTP serving subsystem.
//!
//! # Data Flow
//! ```text
//! Cancellation token (signals, timeout, caller)
//!     → graceful.rs (watch token, request bounded shutdown)
//!     → server.rs (axum serve loop, drain in-flight connections)
//!     → one outcome: clean stop | deadline exceeded | serve error
//! ```

pub mod graceful;
pub mod server;

pub use graceful::{
    graceful, serve_until_signalled, GracefulError, GracefulServer, ServeError, ShutdownError,
};
pub use server::{echo_router, HttpServer};
