use crate::common::*;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use batch_fetcher::server::{process, AppError, ErrorBody, FETCH_ROUTE};
use batch_fetcher::FetchResult;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::task::JoinSet;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn assert_error(response: axum::response::Response, status: StatusCode, message: &str) {
    assert_eq!(response.status(), status);
    let body: ErrorBody = read_json(response).await;
    assert_eq!(body.code, status.as_u16());
    assert_eq!(body.message, message);
}

fn sorted(mut results: Vec<FetchResult>) -> Vec<FetchResult> {
    results.sort_by(|a, b| a.url.cmp(&b.url));
    results
}

#[tokio::test]
async fn test_get_is_method_not_allowed() {
    let (app, _) = test_app(&test_config());
    let request = Request::builder()
        .method(Method::GET)
        .uri(FETCH_ROUTE)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_error(response, StatusCode::METHOD_NOT_ALLOWED, "Method not allowed").await;
}

#[tokio::test]
async fn test_missing_body_is_invalid() {
    let (app, _) = test_app(&test_config());

    let response = app.oneshot(post_raw(Body::empty())).await.unwrap();
    assert_error(
        response,
        StatusCode::BAD_REQUEST,
        "Invalid Request. Unable to decode request body",
    )
    .await;
}

#[tokio::test]
async fn test_stalled_body_is_cut_off() {
    let mut config = test_config();
    config.server.read_timeout_ms = 100;
    let (app, state) = test_app(&config);

    // First chunk arrives, then the client goes quiet with the connection open
    let (mut writer, reader) = tokio::io::duplex(64);
    writer.write_all(b"[\"http://").await.unwrap();
    let body = Body::from_stream(ReaderStream::new(reader));

    let start = Instant::now();
    let response = app.oneshot(post_raw(body)).await.unwrap();
    assert!(start.elapsed() < Duration::from_secs(2));
    assert_error(
        response,
        StatusCode::BAD_REQUEST,
        "Invalid Request. Unable to decode request body",
    )
    .await;
    assert_eq!(state.admission.in_flight(), 0);
    drop(writer);
}

#[tokio::test]
async fn test_null_body_is_an_empty_batch() {
    let (app, _) = test_app(&test_config());

    let response = app.oneshot(post_raw("null")).await.unwrap();
    assert_error(response, StatusCode::BAD_REQUEST, "Invalid Request. Empty URL list").await;
}

#[tokio::test]
async fn test_empty_batch_is_rejected() {
    let (app, _) = test_app(&test_config());

    let response = app.oneshot(post_raw("[]")).await.unwrap();
    assert_error(response, StatusCode::BAD_REQUEST, "Invalid Request. Empty URL list").await;
}

#[tokio::test]
async fn test_oversized_batch_is_rejected_before_fetching() {
    let mock_server = MockServer::start().await;
    let urls = mount_pages(&mock_server, 21).await;
    let (app, _) = test_app(&test_config());

    let response = app.oneshot(post_batch(&urls)).await.unwrap();
    assert_error(
        response,
        StatusCode::BAD_REQUEST,
        "Invalid Request. URL list exceeds maximum length",
    )
    .await;
    assert_eq!(request_count(&mock_server).await, 0);
}

#[tokio::test]
async fn test_full_batch_succeeds() {
    let mock_server = MockServer::start().await;
    let urls = mount_pages(&mock_server, 20).await;
    let (app, state) = test_app(&test_config());

    let response = app.oneshot(post_batch(&urls)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );

    let results: Vec<FetchResult> = read_json(response).await;
    assert_eq!(results.len(), 20);
    for result in &results {
        assert!(urls.contains(&result.url));
        let index = result.url.rsplit('/').next().unwrap();
        assert_eq!(result.content, format!("content-{index}").into_bytes());
    }
    assert_eq!(state.admission.in_flight(), 0);
}

#[tokio::test]
async fn test_resubmitted_batch_yields_same_pairs() {
    let mock_server = MockServer::start().await;
    let urls = mount_pages(&mock_server, 10).await;
    let (app, _) = test_app(&test_config());

    let first = app.clone().oneshot(post_batch(&urls)).await.unwrap();
    let second = app.oneshot(post_batch(&urls)).await.unwrap();

    let first: Vec<FetchResult> = read_json(first).await;
    let second: Vec<FetchResult> = read_json(second).await;
    assert_eq!(sorted(first), sorted(second));
}

#[tokio::test]
async fn test_unresolvable_url_fails_request() {
    let mock_server = MockServer::start().await;
    let mut urls = mount_pages(&mock_server, 3).await;
    urls.push(UNRESOLVABLE_URL.to_string());
    let mut config = test_config();
    config.limits.per_url_timeout_ms = 10_000;
    let (app, _) = test_app(&config);

    let response = app.oneshot(post_batch(&urls)).await.unwrap();
    assert_error(
        response,
        StatusCode::BAD_REQUEST,
        "One or more URLs were not found",
    )
    .await;
}

#[tokio::test]
async fn test_slow_url_times_out_request() {
    let mock_server = MockServer::start().await;
    let mut urls = mount_pages(&mock_server, 3).await;
    urls.push(mount_delayed(&mock_server, "/stall", "late", Duration::from_secs(3)).await);
    let mut config = test_config();
    config.limits.per_url_timeout_ms = 200;
    let (app, _) = test_app(&config);

    let response = app.oneshot(post_batch(&urls)).await.unwrap();
    assert_error(response, StatusCode::REQUEST_TIMEOUT, "Request Timeout").await;
}

#[tokio::test]
async fn test_request_deadline_times_out_request() {
    let mock_server = MockServer::start().await;
    let slow = mount_delayed(&mock_server, "/stall", "late", Duration::from_secs(3)).await;
    let mut config = test_config();
    config.limits.request_timeout_ms = Some(150);
    let (app, _) = test_app(&config);

    let response = app.oneshot(post_batch(&[slow])).await.unwrap();
    assert_error(response, StatusCode::REQUEST_TIMEOUT, "Request Timeout").await;
}

#[tokio::test]
async fn test_malformed_url_is_bad_request() {
    let (app, _) = test_app(&test_config());

    let response = app
        .oneshot(post_batch(&["definitely not a url".to_string()]))
        .await
        .unwrap();
    assert_error(response, StatusCode::BAD_REQUEST, "Bad Request").await;
}

#[tokio::test]
async fn test_refused_connection_is_bad_request() {
    let (app, _) = test_app(&test_config());

    let response = app.oneshot(post_batch(&[refused_url()])).await.unwrap();
    assert_error(response, StatusCode::BAD_REQUEST, "Bad Request").await;
}

#[tokio::test]
async fn test_caller_cancellation_mid_fetch() {
    let mock_server = MockServer::start().await;
    let slow = mount_delayed(&mock_server, "/stall", "late", Duration::from_secs(3)).await;
    let state = test_state(&test_config());
    let caller = CancellationToken::new();
    let canceller = caller.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let result = process(&state, post_batch(&[slow.clone(), slow]), &caller).await;
    assert!(matches!(result, Err(AppError::RequestCancelled(_))));
}

#[tokio::test]
async fn test_dropped_request_releases_admission_slot() {
    let mock_server = MockServer::start().await;
    let slow = mount_delayed(&mock_server, "/stall", "late", Duration::from_secs(3)).await;
    let (app, state) = test_app(&test_config());

    // Dropping the response future is what a client disconnect looks like to the handler
    let outcome = tokio::time::timeout(
        Duration::from_millis(200),
        app.oneshot(post_batch(&[slow])),
    )
    .await;

    assert!(outcome.is_err());
    assert_eq!(state.admission.in_flight(), 0);
}

#[tokio::test]
async fn test_full_admission_sheds_without_side_effects() {
    let mock_server = MockServer::start().await;
    let urls = mount_pages(&mock_server, 2).await;
    let mut config = test_config();
    config.limits.max_concurrent_requests = 2;
    let (app, state) = test_app(&config);

    let held = state.admission.try_admit().unwrap();
    let response = app.clone().oneshot(post_batch(&urls)).await.unwrap();
    assert_error(response, StatusCode::TOO_MANY_REQUESTS, "Too Many Requests").await;
    assert_eq!(request_count(&mock_server).await, 0);
    assert_eq!(state.admission.in_flight(), 1);

    drop(held);
    let response = app.oneshot(post_batch(&urls)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_concurrent_load_is_bounded() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("ok")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;
    let urls = vec![format!("{}/busy", mock_server.uri())];
    let mut config = test_config();
    config.limits.max_concurrent_requests = 5;
    let (app, state) = test_app(&config);

    let mut requests = JoinSet::new();
    for _ in 0..10 {
        let app = app.clone();
        let request = post_batch(&urls);
        requests.spawn(async move { app.oneshot(request).await.unwrap().status() });
    }

    let mut admitted = 0;
    let mut shed = 0;
    while let Some(status) = requests.join_next().await {
        match status.unwrap() {
            StatusCode::OK => admitted += 1,
            StatusCode::TOO_MANY_REQUESTS => shed += 1,
            other => panic!("unexpected status {other}"),
        }
    }

    // The request that brings the count to the limit is shed
    assert!(admitted <= 4, "admitted {admitted} requests");
    assert!(shed >= 1);
    assert_eq!(admitted + shed, 10);
    assert_eq!(state.admission.in_flight(), 0);
}
