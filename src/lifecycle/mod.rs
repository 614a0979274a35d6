//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT (or caller-chosen set) → cancel SignalContext token
//!     → token handed to http::graceful
//! ```

pub mod signals;

pub use signals::{with_signals, Cause, Signal, SignalContext};
