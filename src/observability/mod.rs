//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (structured, filtered by EnvFilter)
//! Application code may also log through:
//!     → logging.rs Logger (print/verbose/fatal/panic families)
//! ```

pub mod logging;

pub use logging::{init_tracing, Log, Logger, Sink};
