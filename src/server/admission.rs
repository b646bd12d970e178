//! Admission control: a shared in-flight counter that sheds excess load

use crate::server::{AppError, AppState};
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts requests past admission and rejects new ones once the limit is reached
#[derive(Debug)]
pub struct AdmissionController {
    in_flight: AtomicUsize,
    limit: usize,
}

impl AdmissionController {
    pub fn new(limit: usize) -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Claims a slot, or fails with `TooManyRequests` if the post-increment count
    /// reaches the limit
    ///
    /// The slot is released when the returned permit is dropped, including during a
    /// panic unwind. A rejected attempt releases its increment before returning.
    pub fn try_admit(self: &Arc<Self>) -> Result<AdmissionPermit, AppError> {
        let count = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let permit = AdmissionPermit {
            controller: Arc::clone(self),
        };

        if count >= self.limit {
            drop(permit);
            return Err(AppError::TooManyRequests);
        }

        Ok(permit)
    }
}

/// One admitted slot; decrements the counter on drop
#[derive(Debug)]
#[must_use = "the slot is released as soon as the permit is dropped"]
pub struct AdmissionPermit {
    controller: Arc<AdmissionController>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.controller.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Router middleware wrapping the request processor
pub async fn admission_layer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let _permit = match state.admission.try_admit() {
        Ok(permit) => permit,
        Err(err) => {
            tracing::warn!(
                in_flight = state.admission.in_flight(),
                limit = state.admission.limit(),
                "Shedding request"
            );
            return err.into_response();
        }
    };

    next.run(request).await
}
