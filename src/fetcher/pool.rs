//! Bounded worker pool for batch retrieval
//!
//! A batch is loaded into a queue sized to the batch, a fixed number of workers drain
//! it, and every outcome is fanned back in through a single channel. The first error
//! cancels the remaining work; the pool is always joined before returning.

use crate::fetcher::client::fetch_url;
use crate::fetcher::{FetchResult, FetchScope};
use crate::FetchError;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

type Outcome = Result<FetchResult, FetchError>;

/// Fetches every URL of `urls` with at most `workers` requests in flight
///
/// # Arguments
///
/// * `client` - The shared HTTP client
/// * `urls` - The batch, in submission order
/// * `workers` - Size of the worker pool (values below 1 are treated as 1)
/// * `per_url_timeout` - Deadline applied to each URL independently
/// * `scope` - The caller's scope; its cancellation and deadline bound every fetch
///
/// # Returns
///
/// * `Ok(Vec<FetchResult>)` - One result per URL, in arrival order
/// * `Err(FetchError)` - The first error any worker reported; no results are returned
///
/// # Example
///
/// ```no_run
/// use batch_fetcher::config::ClientConfig;
/// use batch_fetcher::fetcher::{build_http_client, fetch_batch, FetchScope};
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = build_http_client(&ClientConfig::default())?;
/// let scope = FetchScope::new(CancellationToken::new());
/// let urls = vec!["https://example.com/".to_string()];
///
/// let results = fetch_batch(&client, urls, 4, Duration::from_secs(1), &scope).await?;
/// assert_eq!(results.len(), 1);
/// # Ok(())
/// # }
/// ```
pub async fn fetch_batch(
    client: &Client,
    urls: Vec<String>,
    workers: usize,
    per_url_timeout: Duration,
    scope: &FetchScope,
) -> Result<Vec<FetchResult>, FetchError> {
    let total = urls.len();
    let workers = workers.max(1);
    let start = Instant::now();

    tracing::debug!(urls = total, workers, "Starting batch fetch");

    // Sized to the batch so loading never waits on a worker
    let (task_tx, task_rx) = mpsc::channel::<String>(total.max(1));
    for url in urls {
        if task_tx.send(url).await.is_err() {
            break;
        }
    }
    drop(task_tx);
    let queue = Arc::new(Mutex::new(task_rx));

    // Cancelled on first error without touching the caller's scope
    let batch_scope = scope.child();

    let (outcome_tx, mut outcome_rx) = mpsc::channel::<Outcome>(total.max(1));
    let mut pool = JoinSet::new();
    for worker_id in 0..workers {
        pool.spawn(worker(
            worker_id,
            client.clone(),
            Arc::clone(&queue),
            outcome_tx.clone(),
            batch_scope.clone(),
            per_url_timeout,
        ));
    }
    drop(outcome_tx);

    let mut results = Vec::with_capacity(total);
    let mut first_error: Option<FetchError> = None;

    // Ends once every worker has dropped its sender
    while let Some(outcome) = outcome_rx.recv().await {
        match outcome {
            Ok(result) => results.push(result),
            Err(err) if first_error.is_none() => {
                tracing::debug!(url = err.url(), error = %err, "Aborting batch on first error");
                batch_scope.cancel();
                first_error = Some(err);
            }
            Err(err) => {
                tracing::trace!(url = err.url(), error = %err, "Discarding secondary error");
            }
        }
    }

    while let Some(joined) = pool.join_next().await {
        if let Err(join_err) = joined {
            if join_err.is_panic() {
                std::panic::resume_unwind(join_err.into_panic());
            }
        }
    }

    if let Some(err) = first_error {
        return Err(err);
    }

    tracing::debug!(
        urls = total,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Batch fetch completed"
    );

    Ok(results)
}

/// Pulls URLs until the queue is empty or a fetch fails
async fn worker(
    worker_id: usize,
    client: Client,
    queue: Arc<Mutex<mpsc::Receiver<String>>>,
    outcomes: mpsc::Sender<Outcome>,
    scope: FetchScope,
    per_url_timeout: Duration,
) {
    loop {
        let next = queue.lock().await.recv().await;
        let Some(url) = next else {
            break;
        };

        tracing::trace!(worker_id, url = %url, "Fetching");
        let outcome = fetch_url(&client, &url, &scope.child_with_timeout(per_url_timeout)).await;
        let failed = outcome.is_err();

        if outcomes.send(outcome).await.is_err() || failed {
            break;
        }
    }
}
