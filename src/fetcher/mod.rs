//! Fetch engine for URL batches
//!
//! This module contains the outbound side of the service:
//! - HTTP client construction with a typed DNS resolver
//! - Single-URL retrieval under a cancellation scope
//! - The bounded worker pool that fans a batch out and back in

mod client;
mod pool;
mod resolver;
mod result;
mod scope;

pub use client::{build_http_client, fetch_url};
pub use pool::fetch_batch;
pub use resolver::{is_resolve_failure, ResolveError, TokioResolver};
pub use result::FetchResult;
pub use scope::FetchScope;
