use crate::server::admission::admission_layer;
use crate::server::processor::fetch_handler;
use crate::server::{AppError, AppState};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use std::any::Any;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::timeout::RequestBodyTimeoutLayer;
use tower_http::trace::TraceLayer;

pub const FETCH_ROUTE: &str = "/api/v1/fetch";

/// Builds the service router
///
/// The route takes any method so the processor can answer 405 with the JSON error body.
/// Admission wraps only the processor; panics anywhere below become a 500. A body that
/// stalls longer than the read timeout fails to decode.
pub fn build_router(state: AppState) -> Router {
    let read_timeout = state.read_timeout;

    Router::new()
        .route(FETCH_ROUTE, any(fetch_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admission_layer,
        ))
        .layer(RequestBodyTimeoutLayer::new(read_timeout))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    AppError::Internal(format!("handler panicked: {detail}").into()).into_response()
}
