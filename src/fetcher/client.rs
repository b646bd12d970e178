//! HTTP client construction and single-URL retrieval

use crate::config::ClientConfig;
use crate::fetcher::resolver::TokioResolver;
use crate::fetcher::{FetchResult, FetchScope};
use crate::FetchError;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Builds the shared outbound HTTP client
///
/// # Arguments
///
/// * `config` - The client configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use batch_fetcher::config::ClientConfig;
/// use batch_fetcher::fetcher::build_http_client;
///
/// let client = build_http_client(&ClientConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &ClientConfig) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
        .dns_resolver(Arc::new(TokioResolver))
        .gzip(true)
        .brotli(true);

    if !config.use_system_proxy {
        builder = builder.no_proxy();
    }

    builder.build()
}

/// Retrieves one URL within `scope`
///
/// Issues a single GET and reads the whole body. The upstream status code is not
/// inspected: any response that arrives intact is a result. Connect, send, and body
/// read are all abandoned as soon as the scope is cancelled or expires.
pub async fn fetch_url(
    client: &Client,
    url: &str,
    scope: &FetchScope,
) -> Result<FetchResult, FetchError> {
    scope
        .run(url, async {
            let target = Url::parse(url).map_err(|source| FetchError::InvalidUrl {
                url: url.to_string(),
                source,
            })?;

            let response = client.get(target).send().await.map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;

            let content = response.bytes().await.map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;

            Ok::<_, FetchError>(FetchResult {
                url: url.to_string(),
                content: content.to_vec(),
            })
        })
        .await
}
