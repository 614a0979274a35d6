use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use netkit::config::{load_config, validate_config, AppConfig, ConfigError};
use netkit::http::{echo_router, graceful, HttpServer};
use netkit::lifecycle::with_signals;
use netkit::observability::{init_tracing, Log, Logger, Sink};

#[derive(Parser)]
#[command(name = "netkit")]
#[command(about = "Echo HTTP server with graceful shutdown", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,

    /// Bind address, overrides the configuration file
    #[arg(short, long)]
    bind: Option<String>,

    /// Shutdown deadline in milliseconds (0 waits for all requests)
    #[arg(long)]
    shutdown_timeout_ms: Option<u64>,
}

/// Load the configuration file (if any), apply CLI overrides and validate
/// the result.
fn resolve_config(cli: Cli) -> Result<AppConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if cli.verbose {
        config.logging.verbose = true;
    }
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if let Some(ms) = cli.shutdown_timeout_ms {
        config.server.shutdown_timeout_ms = ms;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(Cli::parse())?;

    init_tracing(&config.logging);
    let log = Logger::new(&config.logging, Sink::Tracing);

    tracing::info!(
        bind_address = %config.server.bind_address,
        shutdown_timeout_ms = config.server.shutdown_timeout_ms,
        request_timeout_secs = config.server.request_timeout_secs,
        "Configuration loaded"
    );
    log.verbosef(format_args!("shutdown signals: {:?}", config.signals.shutdown));

    let ctx = with_signals(&CancellationToken::new(), &config.signals.shutdown)?;
    let server = Arc::new(HttpServer::new(
        config.server.bind_address.clone(),
        echo_router(config.server.request_timeout()),
    ));

    let outcome = graceful(ctx.token(), server, config.server.shutdown_timeout()).await;
    match &outcome {
        Ok(()) => tracing::info!(cause = ?ctx.cause(), "Shutdown complete"),
        Err(e) => tracing::error!(error = %e, cause = ?ctx.cause(), "Server stopped with error"),
    }
    outcome?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use netkit::config::ValidationError;

    #[test]
    fn overrides_are_applied() {
        let cli = Cli::parse_from(["netkit", "-v", "--bind", "0.0.0.0:9000", "--shutdown-timeout-ms", "0"]);
        let config = resolve_config(cli).unwrap();
        assert!(config.logging.verbose);
        assert_eq!(config.server.bind_address, "0.0.0.0:9000");
        assert_eq!(config.server.shutdown_timeout_ms, 0);
    }

    #[test]
    fn overridden_bind_address_is_validated() {
        let cli = Cli::parse_from(["netkit", "--bind", "localhost"]);
        match resolve_config(cli) {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors, vec![ValidationError::BindAddress("localhost".into())])
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
