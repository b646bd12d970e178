use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

pub const DEFAULT_MAX_BATCH_SIZE: usize = 20;
pub const DEFAULT_MAX_WORKERS: usize = 4;
pub const DEFAULT_PER_URL_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 100;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 40_000;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 10_000;

/// Main configuration structure for Batch-Fetcher
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the listener to
    #[serde(default = "default_address")]
    pub address: IpAddr,

    /// Port to bind the listener to
    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest request body read before the batch is rejected
    #[serde(rename = "max-request-body-bytes", default = "default_max_request_body_bytes")]
    pub max_request_body_bytes: usize,

    /// Seconds in-flight requests get to finish after a shutdown signal
    #[serde(rename = "shutdown-grace-secs", default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,

    /// Longest the request body may stall between chunks (milliseconds)
    #[serde(rename = "read-timeout-ms", default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

impl ServerConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Batch and concurrency limits
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum number of URLs accepted in one batch
    #[serde(rename = "max-batch-size", default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Number of concurrent outbound fetches per request
    #[serde(rename = "max-workers", default = "default_max_workers")]
    pub max_workers: usize,

    /// Deadline for a single URL fetch (milliseconds)
    #[serde(rename = "per-url-timeout-ms", default = "default_per_url_timeout_ms")]
    pub per_url_timeout_ms: u64,

    /// Requests admitted at once; the request that reaches this count is shed
    #[serde(
        rename = "max-concurrent-requests",
        default = "default_max_concurrent_requests"
    )]
    pub max_concurrent_requests: usize,

    /// Deadline for the whole fetch phase of one request (milliseconds)
    #[serde(rename = "request-timeout-ms", default = "default_request_timeout_ms")]
    pub request_timeout_ms: Option<u64>,
}

impl LimitsConfig {
    pub fn per_url_timeout(&self) -> Duration {
        Duration::from_millis(self.per_url_timeout_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

/// Outbound HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// User-Agent header sent with every fetch
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// TCP connect timeout (milliseconds)
    #[serde(rename = "connect-timeout-ms", default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Honour HTTP_PROXY / HTTPS_PROXY / NO_PROXY from the environment
    #[serde(rename = "use-system-proxy", default = "default_use_system_proxy")]
    pub use_system_proxy: bool,
}

fn default_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}
fn default_port() -> u16 {
    8080
}
fn default_max_request_body_bytes() -> usize {
    64 * 1024
}
fn default_shutdown_grace_secs() -> u64 {
    30
}
fn default_read_timeout_ms() -> u64 {
    DEFAULT_READ_TIMEOUT_MS
}
fn default_request_timeout_ms() -> Option<u64> {
    Some(DEFAULT_REQUEST_TIMEOUT_MS)
}
fn default_max_batch_size() -> usize {
    DEFAULT_MAX_BATCH_SIZE
}
fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}
fn default_per_url_timeout_ms() -> u64 {
    DEFAULT_PER_URL_TIMEOUT_MS
}
fn default_max_concurrent_requests() -> usize {
    DEFAULT_MAX_CONCURRENT_REQUESTS
}
fn default_user_agent() -> String {
    concat!("batch-fetcher/", env!("CARGO_PKG_VERSION")).to_string()
}
fn default_connect_timeout_ms() -> u64 {
    1000
}
fn default_use_system_proxy() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            max_request_body_bytes: default_max_request_body_bytes(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_workers: DEFAULT_MAX_WORKERS,
            per_url_timeout_ms: DEFAULT_PER_URL_TIMEOUT_MS,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout_ms: default_connect_timeout_ms(),
            use_system_proxy: default_use_system_proxy(),
        }
    }
}
