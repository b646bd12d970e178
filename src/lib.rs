//! Batch-Fetcher: a bounded-concurrency URL batch retrieval service
//!
//! This crate accepts a batch of URLs over HTTP, retrieves them through a fixed pool of
//! workers with a per-URL deadline, and answers with either every body or one classified
//! error. Concurrently processed requests are bounded by an admission gate.

pub mod config;
pub mod fetcher;
pub mod server;

use thiserror::Error;

/// Error produced while retrieving a single URL of a batch
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Request cancelled for {url}")]
    Cancelled { url: String },

    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        source: ::url::ParseError,
    },

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },
}

impl FetchError {
    /// The URL whose retrieval failed
    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url }
            | Self::Cancelled { url }
            | Self::InvalidUrl { url, .. }
            | Self::Http { url, .. } => url,
        }
    }

    /// True for an expired scope deadline or a client-side timeout
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Http { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// True when the transport error was caused by a host that could not be resolved
    pub fn is_unresolved_host(&self) -> bool {
        match self {
            Self::Http { source, .. } => fetcher::is_resolve_failure(source),
            _ => false,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for fetch operations
pub type Result<T> = std::result::Result<T, FetchError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use fetcher::{fetch_batch, FetchResult};
pub use server::{AppError, AppState};
