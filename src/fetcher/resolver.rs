//! Name resolution for the outbound client
//!
//! reqwest only exposes transport failures as an opaque error chain. Resolving names
//! ourselves puts a typed [`ResolveError`] into that chain, so a host that does not exist
//! can be told apart from a refused connection.

use hyper::client::connect::dns::Name;
use reqwest::dns::{Addrs, Resolve, Resolving};
use std::error::Error as StdError;
use std::net::SocketAddr;
use thiserror::Error;

/// Failure to turn a host name into socket addresses
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("failed to resolve {host}: {source}")]
    Lookup {
        host: String,
        source: std::io::Error,
    },

    #[error("no addresses found for {host}")]
    NoAddresses { host: String },
}

/// Resolver backed by `tokio::net::lookup_host`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioResolver;

impl Resolve for TokioResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let host = name.as_str().to_string();
        Box::pin(async move {
            // Port is filled in by the connector
            let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), 0))
                .await
                .map_err(|source| ResolveError::Lookup {
                    host: host.clone(),
                    source,
                })?
                .collect();

            if addrs.is_empty() {
                return Err(Box::new(ResolveError::NoAddresses { host })
                    as Box<dyn StdError + Send + Sync>);
            }

            Ok::<Addrs, Box<dyn StdError + Send + Sync>>(Box::new(addrs.into_iter()))
        })
    }
}

/// Walks an error's source chain looking for a [`ResolveError`]
pub fn is_resolve_failure(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.downcast_ref::<ResolveError>().is_some() {
            return true;
        }
        current = e.source();
    }
    false
}
