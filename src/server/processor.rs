//! Request processing pipeline for `/api/v1/fetch`
//!
//! A request moves through validation, fetching, and responding. Validation failures are
//! reported before any outbound I/O; fetch failures are classified once, here.

use crate::fetcher::{fetch_batch, FetchResult, FetchScope};
use crate::server::error::classify;
use crate::server::{AppError, AppState};
use axum::body::to_bytes;
use axum::extract::{Request, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio_util::sync::CancellationToken;

/// Axum handler for the fetch endpoint
///
/// The caller token is cancelled when this future is dropped, which is what hyper does
/// once the client connection goes away. Workers still in flight observe that and stop;
/// nothing is ever written to the defunct connection.
pub async fn fetch_handler(State(state): State<AppState>, request: Request) -> Response {
    let caller = CancellationToken::new();
    let _disconnect = caller.clone().drop_guard();

    match process(&state, request, &caller).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

/// Runs one request through the pipeline under the caller's cancellation token
pub async fn process(
    state: &AppState,
    request: Request,
    caller: &CancellationToken,
) -> Result<Response, AppError> {
    if request.method() != Method::POST {
        return Err(AppError::MethodNotAllowed);
    }

    let body = to_bytes(request.into_body(), state.max_request_body_bytes)
        .await
        .map_err(|e| AppError::InvalidBody(e.into()))?;
    let batch = parse_batch(&body, state.limits.max_batch_size)?;

    let results = run_batch(state, batch, caller).await?;

    // The fetch may have won the race against a disconnect by a hair
    if caller.is_cancelled() {
        tracing::debug!("Caller went away before the response was written");
        return Err(AppError::RequestCancelled(None));
    }

    let payload = serde_json::to_vec(&results).map_err(|e| AppError::Internal(e.into()))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        payload,
    )
        .into_response())
}

/// Decodes and bounds-checks a batch
///
/// Checks run in order, first failure wins: decodable JSON array of strings, non-empty,
/// no longer than `max_batch_size`. Only the first JSON value is read; anything after it
/// is ignored, and `null` counts as an empty batch.
pub fn parse_batch(body: &[u8], max_batch_size: usize) -> Result<Vec<String>, AppError> {
    let mut values = serde_json::Deserializer::from_slice(body).into_iter::<Option<Vec<String>>>();
    let batch = match values.next() {
        Some(Ok(batch)) => batch.unwrap_or_default(),
        Some(Err(e)) => return Err(AppError::InvalidBody(e.into())),
        None => return Err(AppError::InvalidBody("request body is empty".into())),
    };

    if batch.is_empty() {
        return Err(AppError::EmptyBatch);
    }

    if batch.len() > max_batch_size {
        return Err(AppError::BatchTooLarge {
            len: batch.len(),
            limit: max_batch_size,
        });
    }

    Ok(batch)
}

/// Drives the fetch engine for a validated batch and classifies any failure
pub async fn run_batch(
    state: &AppState,
    batch: Vec<String>,
    caller: &CancellationToken,
) -> Result<Vec<FetchResult>, AppError> {
    let mut scope = FetchScope::new(caller.child_token());
    if let Some(timeout) = state.limits.request_timeout() {
        scope = scope.with_timeout(timeout);
    }

    fetch_batch(
        &state.client,
        batch,
        state.limits.max_workers,
        state.limits.per_url_timeout(),
        &scope,
    )
    .await
    .map_err(classify)
}
