//! Structured logging and the verbosity-gated logging facade.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Provide print/printf/println style logging with an optional verbose gate
//! - Provide fatal (exit) and panic (abort control flow) variants
//!
//! # Design Decisions
//! - Verbosity is injected through `LogConfig`, never read from globals
//! - `Sink::Tracing` forwards to `tracing`; `Sink::Writer` writes plain lines
//! - Log level configurable via config and the `RUST_LOG` environment

use std::fmt::{self, Display, Write as _};
use std::io::Write;
use std::sync::{Arc, Mutex};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured filter; without either, verbose mode
/// logs this crate at DEBUG and everything else at INFO.
pub fn init_tracing(config: &LogConfig) {
    let fallback = config.filter.clone().unwrap_or_else(|| {
        if config.verbose {
            "netkit=debug,tower_http=debug".to_string()
        } else {
            "netkit=info,tower_http=info".to_string()
        }
    });

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Where a [`Logger`] sends its lines.
#[derive(Clone)]
pub enum Sink {
    /// Emit `tracing` events.
    Tracing,
    /// Write prefixed lines to a shared writer.
    Writer(Arc<Mutex<dyn Write + Send>>),
}

impl Sink {
    pub fn writer(w: impl Write + Send + 'static) -> Self {
        Sink::Writer(Arc::new(Mutex::new(w)))
    }

    pub fn stderr() -> Self {
        Self::writer(std::io::stderr())
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sink::Tracing => f.write_str("Tracing"),
            Sink::Writer(_) => f.write_str("Writer"),
        }
    }
}

/// Logging capability set.
///
/// Only [`Log::write_line`] and [`Log::verbose_enabled`] are required; the
/// print, verbose, fatal and panic families are built on them.
pub trait Log {
    /// Emit one formatted line.
    fn write_line(&self, level: Level, line: &str);

    /// Whether the `verbose*` family emits.
    fn verbose_enabled(&self) -> bool;

    /// Log the items written back to back, with no separator.
    ///
    /// Use [`Log::println`] when items should be separated by spaces.
    fn print(&self, items: &[&dyn Display]) {
        self.write_line(Level::INFO, &concat(items));
    }

    fn printf(&self, args: fmt::Arguments<'_>) {
        self.write_line(Level::INFO, &args.to_string());
    }

    /// Log the items separated by spaces.
    fn println(&self, items: &[&dyn Display]) {
        self.write_line(Level::INFO, &join(items));
    }

    fn verbose(&self, items: &[&dyn Display]) {
        if self.verbose_enabled() {
            self.write_line(Level::DEBUG, &concat(items));
        }
    }

    fn verbosef(&self, args: fmt::Arguments<'_>) {
        if self.verbose_enabled() {
            self.write_line(Level::DEBUG, &args.to_string());
        }
    }

    fn verboseln(&self, items: &[&dyn Display]) {
        if self.verbose_enabled() {
            self.write_line(Level::DEBUG, &join(items));
        }
    }

    /// Log, then exit the process with status 1.
    fn fatal(&self, items: &[&dyn Display]) -> ! {
        self.write_line(Level::ERROR, &concat(items));
        std::process::exit(1)
    }

    fn fatalf(&self, args: fmt::Arguments<'_>) -> ! {
        self.write_line(Level::ERROR, &args.to_string());
        std::process::exit(1)
    }

    fn fatalln(&self, items: &[&dyn Display]) -> ! {
        self.write_line(Level::ERROR, &join(items));
        std::process::exit(1)
    }

    /// Log, then panic with the same message.
    ///
    /// This unwinds the calling thread. Use it only for states the program
    /// cannot continue from, never for expected failures.
    fn panic(&self, items: &[&dyn Display]) -> ! {
        let msg = concat(items);
        self.write_line(Level::ERROR, &msg);
        panic!("{}", msg)
    }

    fn panicf(&self, args: fmt::Arguments<'_>) -> ! {
        let msg = args.to_string();
        self.write_line(Level::ERROR, &msg);
        panic!("{}", msg)
    }

    fn panicln(&self, items: &[&dyn Display]) -> ! {
        let msg = join(items);
        self.write_line(Level::ERROR, &msg);
        panic!("{}", msg)
    }
}

fn concat(items: &[&dyn Display]) -> String {
    let mut out = String::new();
    for item in items {
        let _ = write!(out, "{}", item);
    }
    out
}

fn join(items: &[&dyn Display]) -> String {
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{}", item);
    }
    out
}

/// The logging facade.
#[derive(Debug, Clone)]
pub struct Logger {
    verbose: bool,
    prefix: String,
    sink: Sink,
}

impl Logger {
    pub fn new(config: &LogConfig, sink: Sink) -> Self {
        Self {
            verbose: config.verbose,
            prefix: config.prefix.clone(),
            sink,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Log for Logger {
    fn write_line(&self, level: Level, line: &str) {
        match &self.sink {
            Sink::Tracing => {
                let line = line.trim_end_matches('\n');
                match level {
                    Level::ERROR => tracing::error!(prefix = %self.prefix, "{}", line),
                    Level::WARN => tracing::warn!(prefix = %self.prefix, "{}", line),
                    Level::INFO => tracing::info!(prefix = %self.prefix, "{}", line),
                    Level::DEBUG => tracing::debug!(prefix = %self.prefix, "{}", line),
                    _ => tracing::trace!(prefix = %self.prefix, "{}", line),
                }
            }
            Sink::Writer(w) => {
                let mut buf = String::with_capacity(self.prefix.len() + line.len() + 1);
                buf.push_str(&self.prefix);
                buf.push_str(line);
                if !buf.ends_with('\n') {
                    buf.push('\n');
                }
                let mut w = w.lock().unwrap_or_else(|e| e.into_inner());
                let _ = w.write_all(buf.as_bytes());
            }
        }
    }

    fn verbose_enabled(&self) -> bool {
        self.verbose
    }
}
