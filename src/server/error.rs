//! Public error taxonomy and its HTTP rendering

use crate::FetchError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A classified request failure
///
/// The `Display` text of each variant is the message sent to the caller.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Invalid Request. Unable to decode request body")]
    InvalidBody(#[source] BoxError),

    #[error("Invalid Request. Empty URL list")]
    EmptyBatch,

    #[error("Invalid Request. URL list exceeds maximum length")]
    BatchTooLarge { len: usize, limit: usize },

    #[error("Request Timeout")]
    Timeout(#[source] FetchError),

    #[error("Request Cancelled")]
    RequestCancelled(#[source] Option<FetchError>),

    #[error("One or more URLs were not found")]
    UrlNotFound(#[source] FetchError),

    #[error("Bad Request")]
    BadRequest(#[source] FetchError),

    #[error("Too Many Requests")]
    TooManyRequests,

    #[error("Internal Server Error")]
    Internal(#[source] BoxError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::InvalidBody(_)
            | Self::EmptyBatch
            | Self::BatchTooLarge { .. }
            | Self::UrlNotFound(_)
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Timeout(_) | Self::RequestCancelled(_) => StatusCode::REQUEST_TIMEOUT,
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            code: self.status().as_u16(),
            message: self.to_string(),
        }
    }
}

/// Maps a fetch failure onto the public taxonomy
///
/// Precedence: timeout, then cancellation, then unresolvable host; anything else is a
/// generic bad request.
pub fn classify(err: FetchError) -> AppError {
    if err.is_timeout() {
        AppError::Timeout(err)
    } else if err.is_cancelled() {
        AppError::RequestCancelled(Some(err))
    } else if err.is_unresolved_host() {
        AppError::UrlNotFound(err)
    } else {
        AppError::BadRequest(err)
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        classify(err)
    }
}

/// JSON error payload; `code` always equals the HTTP status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let cause = std::error::Error::source(&self).map(|e| e.to_string());

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), cause = ?cause, "{}", self);
        } else {
            tracing::debug!(status = status.as_u16(), cause = ?cause, "{}", self);
        }

        (status, Json(self.body())).into_response()
    }
}
