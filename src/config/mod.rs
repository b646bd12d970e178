//! Configuration module for Batch-Fetcher
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key is optional; a missing file section falls back to the built-in limits.
//!
//! # Example
//!
//! ```no_run
//! use batch_fetcher::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("batch-fetcher.toml")).unwrap();
//! println!("Workers per request: {}", config.limits.max_workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ClientConfig, Config, LimitsConfig, ServerConfig, DEFAULT_MAX_BATCH_SIZE,
    DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_MAX_WORKERS, DEFAULT_PER_URL_TIMEOUT_MS,
    DEFAULT_READ_TIMEOUT_MS, DEFAULT_REQUEST_TIMEOUT_MS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
