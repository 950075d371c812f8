//! Fixed-window rate limiter middleware.
//!
//! Limits requests to a configurable number per second using an atomic
//! counter that resets each second. Applied as an axum middleware.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Extension, Request};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::ErrorBody;

/// Shared state for the rate limiter.
#[derive(Clone)]
pub struct RateLimiter {
    /// Maximum requests allowed per second.
    max_per_sec: u64,
    /// Requests seen in the active window.
    count: Arc<AtomicU64>,
    /// The epoch second of the active window.
    window: Arc<AtomicU64>,
}

impl RateLimiter {
    /// Create a limiter allowing `max_per_sec` requests per second.
    pub fn new(max_per_sec: u64) -> Self {
        Self {
            max_per_sec,
            count: Arc::new(AtomicU64::new(0)),
            window: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Try to acquire a permit. Returns true if the request is allowed.
    pub fn try_acquire(&self) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.try_acquire_at(now)
    }

    fn try_acquire_at(&self, now: u64) -> bool {
        if self.window.swap(now, Ordering::Relaxed) != now {
            self.count.store(1, Ordering::Relaxed);
            return self.max_per_sec > 0;
        }
        let prev = self.count.fetch_add(1, Ordering::Relaxed);
        prev < self.max_per_sec
    }
}

/// Axum middleware that enforces the rate limit.
pub async fn rate_limit_middleware(
    Extension(limiter): Extension<RateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    if limiter.try_acquire() {
        return next.run(req).await;
    }
    tracing::warn!(path = %req.uri().path(), "Rate limit exceeded");
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(ErrorBody {
            error: "too_many_requests".to_string(),
            message: "Rate limit exceeded".to_string(),
            details: None,
        }),
    )
        .into_response()
}
