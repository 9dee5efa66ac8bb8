// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Ident Gateway Project

//! Process-wide request rate limiting.
//!
//! A single token bucket is shared by every inbound request: sustained rate
//! of 15 requests per second with a burst capacity of 5. There is no
//! per-client keying - one noisy caller exhausts the bucket for everyone.
//! Known limitation; per-client limits would need keyed buckets.
//!
//! The bucket sits at the outermost edge of the request pipeline so a
//! rejected request does no further work.

use std::sync::Mutex;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::state::AppState;

/// Sustained admission rate in requests per second.
pub const SUSTAINED_RATE_PER_SEC: f64 = 15.0;

/// Maximum burst admitted from a full bucket.
pub const BURST_CAPACITY: u32 = 5;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Time-based token bucket shared across all requests.
///
/// The bucket state is guarded by a mutex so concurrent bursts cannot
/// double-admit; the critical section is a handful of float operations and
/// is never held across I/O.
pub struct RateLimiter {
    rate_per_sec: f64,
    capacity: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Create a limiter with the given sustained rate and burst capacity.
    /// The bucket starts full.
    pub fn new(rate_per_sec: f64, burst: u32) -> Self {
        Self {
            rate_per_sec,
            capacity: f64::from(burst),
            bucket: Mutex::new(Bucket {
                tokens: f64::from(burst),
                last_refill: Instant::now(),
            }),
        }
    }

    /// Attempt to admit one request. Returns `false` when the bucket is empty.
    pub fn allow(&self) -> bool {
        self.allow_at(Instant::now())
    }

    fn allow_at(&self, now: Instant) -> bool {
        let mut bucket = self.bucket.lock().unwrap_or_else(|e| e.into_inner());
        let elapsed = now.saturating_duration_since(bucket.last_refill);
        bucket.tokens =
            (bucket.tokens + elapsed.as_secs_f64() * self.rate_per_sec).min(self.capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(SUSTAINED_RATE_PER_SEC, BURST_CAPACITY)
    }
}

/// Middleware rejecting requests with 429 once the shared bucket is empty.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.rate_limiter.allow() {
        return ApiError::too_many_requests("rate limit exceeded").into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn burst_admits_exactly_capacity() {
        let limiter = RateLimiter::new(15.0, 5);
        let now = Instant::now();

        let admitted = (0..6).filter(|_| limiter.allow_at(now)).count();
        assert_eq!(admitted, 5);
    }

    #[test]
    fn refills_one_token_per_interval() {
        let limiter = RateLimiter::new(15.0, 5);
        let start = Instant::now();

        for _ in 0..5 {
            assert!(limiter.allow_at(start));
        }
        assert!(!limiter.allow_at(start));

        // 1/15 s later one token is back.
        let later = start + Duration::from_millis(67);
        assert!(limiter.allow_at(later));
        assert!(!limiter.allow_at(later));
    }

    #[test]
    fn bucket_never_exceeds_capacity() {
        let limiter = RateLimiter::new(15.0, 5);
        let start = Instant::now();

        // A long idle period must not accumulate more than the burst size.
        let much_later = start + Duration::from_secs(60);
        let admitted = (0..10).filter(|_| limiter.allow_at(much_later)).count();
        assert_eq!(admitted, 5);
    }

    #[test]
    fn zero_rate_never_refills() {
        let limiter = RateLimiter::new(0.0, 2);
        let start = Instant::now();

        assert!(limiter.allow_at(start));
        assert!(limiter.allow_at(start));
        assert!(!limiter.allow_at(start + Duration::from_secs(3600)));
    }
}
