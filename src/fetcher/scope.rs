//! Cancellation scopes for batch fetching
//!
//! A [`FetchScope`] pairs a cancellation token with an optional deadline. Scopes nest:
//! a child is cancelled with its parent and never outlives the parent's deadline.

use crate::FetchError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct FetchScope {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl FetchScope {
    /// Creates a scope that ends only when `token` is cancelled
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Bounds this scope to expire after `timeout`, keeping any earlier deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(earliest(self.deadline, Instant::now() + timeout));
        self
    }

    /// Creates a child scope with the same deadline and its own cancellation token
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Creates a child scope bounded by `min(remaining lifetime, timeout)`
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        self.child().with_timeout(timeout)
    }

    /// Cancels this scope and every scope derived from it
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Drives `fut` until it completes, the scope is cancelled, or the deadline passes
    ///
    /// Cancellation is checked first, so an already-cancelled scope never polls `fut`.
    pub async fn run<T, F>(&self, url: &str, fut: F) -> Result<T, FetchError>
    where
        F: Future<Output = Result<T, FetchError>>,
    {
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;

            _ = self.token.cancelled() => Err(FetchError::Cancelled {
                url: url.to_string(),
            }),
            _ = expired => Err(FetchError::Timeout {
                url: url.to_string(),
            }),
            res = fut => res,
        }
    }
}

fn earliest(current: Option<Instant>, candidate: Instant) -> Instant {
    match current {
        Some(existing) if existing < candidate => existing,
        _ => candidate,
    }
}
