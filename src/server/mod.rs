//! HTTP surface of the service
//!
//! This module wires the request pipeline together:
//! - Shared application state (client, limits, admission counter)
//! - The admission gate in front of the processor
//! - The request processor and error classifier
//! - Listener startup and graceful shutdown

mod admission;
mod error;
mod processor;
mod router;

pub use admission::{admission_layer, AdmissionController, AdmissionPermit};
pub use error::{classify, AppError, BoxError, ErrorBody};
pub use processor::{fetch_handler, parse_batch, process, run_batch};
pub use router::{build_router, FETCH_ROUTE};

use crate::config::{Config, LimitsConfig};
use crate::fetcher::build_http_client;
use anyhow::Context;
use reqwest::Client;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// State shared by every request
#[derive(Debug, Clone)]
pub struct AppState {
    pub client: Client,
    pub limits: Arc<LimitsConfig>,
    pub admission: Arc<AdmissionController>,
    pub max_request_body_bytes: usize,
    pub read_timeout: Duration,
}

impl AppState {
    /// Builds state with a fresh HTTP client and admission counter
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config.client)?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: &Config) -> Self {
        Self {
            client,
            limits: Arc::new(config.limits.clone()),
            admission: Arc::new(AdmissionController::new(
                config.limits.max_concurrent_requests,
            )),
            max_request_body_bytes: config.server.max_request_body_bytes,
            read_timeout: config.server.read_timeout(),
        }
    }
}

/// Binds the listener and serves until Ctrl+C or SIGTERM
///
/// After the signal, in-flight requests get `shutdown-grace-secs` to finish before the
/// server stops waiting for them.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let address = SocketAddr::new(config.server.address, config.server.port);
    let grace = Duration::from_secs(config.server.shutdown_grace_secs);

    let state = AppState::new(&config).context("Failed to build HTTP client")?;
    let app = build_router(state);

    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    tracing::info!(address = %address, "Listening on http://{}{}", address, FETCH_ROUTE);

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            tracing::error!("Error while waiting for shutdown signal: {e}");
            return;
        }
        tracing::info!("Shutdown signal received, starting graceful shutdown");
        signal_token.cancel();
    });

    let stopped = shutdown.clone().cancelled_owned();
    let server = async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(stopped)
            .await
    };
    let grace_elapsed = async {
        shutdown.cancelled().await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        res = server => res.context("HTTP server failed")?,
        _ = grace_elapsed => {
            tracing::warn!(grace_secs = grace.as_secs(), "Grace period elapsed, abandoning in-flight requests");
        }
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM
async fn shutdown_signal() -> anyhow::Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.context("Failed to install Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<_, anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<anyhow::Result<()>>();

    tokio::select! {
        res = ctrl_c => res?,
        res = terminate => res?,
    }

    Ok(())
}
