//! Rate limiting middleware.
//!
//! Token-bucket limiter keyed by client address (inbound `x-forwarded-for`
//! when present, else the peer IP). Buckets live in process memory; the
//! limiter protects the gateway itself, not any per-tenant quota.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::config::RateLimitConfig;
use crate::http::dispatch::X_FORWARDED_FOR;
use crate::observability::metrics;

/// Buckets idle this long are dropped at the next sweep. The key space is
/// client-controlled, so the map must not grow without bound.
const IDLE_TTL: Duration = Duration::from_secs(60);

/// Minimum interval between sweeps of the bucket map.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// A simple token bucket.
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Bucket map plus the sweep clock, guarded by one mutex.
struct Buckets {
    map: HashMap<String, TokenBucket>,
    last_sweep: Instant,
}

/// Shared state for the limiter.
pub struct RateLimiterState {
    buckets: Mutex<Buckets>,
    rate: f64,
    burst: f64,
}

impl RateLimiterState {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            buckets: Mutex::new(Buckets {
                map: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            rate: config.requests_per_second as f64,
            burst: config.burst_size.max(1) as f64,
        }
    }

    /// Check and consume one token for `key`.
    ///
    /// Also sweeps idle buckets at most once per [`SWEEP_INTERVAL`], so a
    /// flood of unique client keys cannot grow the map forever.
    pub fn check(&self, key: &str) -> bool {
        let mut buckets = self.buckets.lock().expect("rate limiter mutex poisoned");

        let now = Instant::now();
        if now.duration_since(buckets.last_sweep) >= SWEEP_INTERVAL {
            buckets
                .map
                .retain(|_, bucket| now.duration_since(bucket.last_update) < IDLE_TTL);
            buckets.last_sweep = now;
        }

        let bucket = buckets
            .map
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.burst));

        bucket.try_acquire(self.burst, self.rate)
    }

    /// Number of tracked client buckets.
    #[cfg(test)]
    fn bucket_count(&self) -> usize {
        self.buckets.lock().expect("rate limiter mutex poisoned").map.len()
    }

    /// Sustained requests per second, for the 429 response headers.
    pub fn limit(&self) -> u32 {
        self.rate as u32
    }
}

/// Middleware function for per-client rate limiting.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<RateLimiterState>>,
    request: Request,
    next: Next,
) -> Response {
    let key = request
        .headers()
        .get(&X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| addr.ip().to_string());

    if state.check(&key) {
        return next.run(request).await;
    }

    tracing::warn!(client = %key, "rate limit exceeded");
    metrics::record_rate_limited();

    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({
            "error": "Too Many Requests",
            "message": format!("Rate limit exceeded. Max {} requests per second.", state.limit()),
            "retryAfter": 1,
        })),
    )
        .into_response();
    response
        .headers_mut()
        .insert("retry-after", HeaderValue::from_static("1"));
    if let Ok(limit) = HeaderValue::from_str(&state.limit().to_string()) {
        response.headers_mut().insert("x-ratelimit-limit", limit);
    }
    response
}
