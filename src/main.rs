//! Batch-Fetcher main entry point
//!
//! This is the command-line interface that starts the batch fetch HTTP service.

use anyhow::Context;
use batch_fetcher::config::{load_config_with_hash, Config};
use batch_fetcher::server;
use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Batch-Fetcher: fetch many URLs with one request
///
/// Serves `POST /api/v1/fetch`, which takes a JSON array of URLs, retrieves them
/// through a bounded worker pool, and answers with every body or a single error.
#[derive(Parser, Debug)]
#[command(name = "batch-fetcher")]
#[command(version)]
#[command(about = "Bounded-concurrency URL batch fetch service", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen address
    #[arg(long)]
    address: Option<IpAddr>,

    /// Override the listen port
    #[arg(long)]
    port: Option<u16>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    if let Some(address) = cli.address {
        config.server.address = address;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    tracing::info!(
        "Limits: batch <= {}, {} workers, {}ms per URL, {} concurrent requests",
        config.limits.max_batch_size,
        config.limits.max_workers,
        config.limits.per_url_timeout_ms,
        config.limits.max_concurrent_requests
    );

    server::run(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG`, when set, takes precedence over the flags.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            EnvFilter::new("error")
        } else {
            match verbose {
                0 => EnvFilter::new("batch_fetcher=info,warn"),
                1 => EnvFilter::new("batch_fetcher=debug,tower_http=debug,info"),
                2 => EnvFilter::new("batch_fetcher=trace,debug"),
                _ => EnvFilter::new("trace"),
            }
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
