//! Fixed-window rate limiter middleware for the `/api` routes.
//!
//! Counts requests in the current wall-clock second and rejects the overflow
//! with `429 Too Many Requests`.

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
///
/// The current window (low 32 bits of the epoch second) and the number of
/// requests admitted in it are packed into one atomic word, so a window
/// change and the first admission in it happen in a single compare-exchange.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    /// Maximum requests allowed per second.
    max_per_sec: u64,
    /// `window << 32 | count`.
    state: Arc<AtomicU64>,
}

const COUNT_MASK: u64 = 0xFFFF_FFFF;

impl RateLimiter {
    pub fn new(max_per_sec: u64) -> Self {
        Self {
            max_per_sec: max_per_sec.min(COUNT_MASK),
            state: Arc::new(AtomicU64::new(0)),
        }
    }

    fn try_acquire(&self) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.try_acquire_at(now)
    }

    fn try_acquire_at(&self, now: u64) -> bool {
        let window = now & COUNT_MASK;
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let count = if current >> 32 == window {
                current & COUNT_MASK
            } else {
                0
            };
            if count >= self.max_per_sec {
                return false;
            }
            let next = (window << 32) | (count + 1);
            match self
                .state
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}

/// Axum middleware that enforces the rate limit.
pub async fn rate_limit_middleware(
    Extension(limiter): Extension<RateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    if limiter.try_acquire() {
        next.run(req).await
    } else {
        tracing::debug!(limit = limiter.max_per_sec, "Rate limit exceeded");
        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorBody {
                error: "too_many_requests".to_string(),
                message: "Rate limit exceeded".to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_limit_within_window() {
        let limiter = RateLimiter::new(3);
        assert!(limiter.try_acquire_at(10));
        assert!(limiter.try_acquire_at(10));
        assert!(limiter.try_acquire_at(10));
        assert!(!limiter.try_acquire_at(10));
    }

    #[test]
    fn test_new_window_resets_count() {
        let limiter = RateLimiter::new(1);
        assert!(limiter.try_acquire_at(10));
        assert!(!limiter.try_acquire_at(10));
        assert!(limiter.try_acquire_at(11));
    }

    #[test]
    fn test_clones_share_budget() {
        let limiter = RateLimiter::new(1);
        let other = limiter.clone();
        assert!(limiter.try_acquire_at(5));
        assert!(!other.try_acquire_at(5));
    }

    #[test]
    fn test_rejections_do_not_consume_next_window() {
        let limiter = RateLimiter::new(2);
        for _ in 0..10 {
            limiter.try_acquire_at(20);
        }
        assert!(limiter.try_acquire_at(21));
        assert!(limiter.try_acquire_at(21));
        assert!(!limiter.try_acquire_at(21));
    }

    #[test]
    fn test_concurrent_window_change_admits_exactly_limit() {
        let limiter = RateLimiter::new(50);
        assert!(limiter.try_acquire_at(99));

        // Every thread races into the new window at once.
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || (0..20).filter(|_| limiter.try_acquire_at(100)).count())
            })
            .collect();
        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 50);
    }
}
