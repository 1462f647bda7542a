//! Rate limiting middleware
//!
//! Token bucket rate limiting per API key. Limiters are cached in memory and
//! dropped after ten idle minutes.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use moka::future::Cache;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RateLimitConfig;
use crate::error::ErrorResponse;
use crate::middleware::auth::ApiKeyInfo;

// ============================================================================
// Types
// ============================================================================

type KeyLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limit state shared across requests
#[derive(Clone)]
pub struct RateLimitState {
    pub config: RateLimitConfig,

    /// Key: full API key
    pub limiters: Cache<String, Arc<KeyLimiter>>,
}

impl RateLimitState {
    pub fn new(config: RateLimitConfig) -> Self {
        let limiters = Cache::builder()
            .max_capacity(10_000)
            .time_to_idle(Duration::from_secs(600))
            .build();

        Self { config, limiters }
    }

    /// Get or create the limiter of an API key
    pub async fn get_limiter(&self, key_info: &ApiKeyInfo) -> Arc<KeyLimiter> {
        let quota = self.quota();
        self.limiters
            .get_with(key_info.bucket_key().to_string(), async move {
                Arc::new(RateLimiter::direct(quota))
            })
            .await
    }

    /// Bursts up to the full window, replenished evenly over the window
    fn quota(&self) -> Quota {
        let fallback = Quota::per_minute(NonZeroU32::MIN.saturating_add(29));

        let Some(burst) = NonZeroU32::new(self.config.requests_per_window) else {
            return fallback;
        };
        if self.config.window_seconds == 0 {
            return fallback;
        }

        let replenish_period = Duration::from_secs(self.config.window_seconds) / burst.get();
        Quota::with_period(replenish_period)
            .map(|q| q.allow_burst(burst))
            .unwrap_or(fallback)
    }
}

// ============================================================================
// Rate Limit Errors
// ============================================================================

/// Rate limit error with retry information
#[derive(Debug)]
pub struct RateLimitError {
    /// Seconds until the next request is allowed
    pub retry_after_seconds: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let error_response = ErrorResponse::new(
            "rate_limit_error",
            &format!(
                "Rate limit exceeded. Please retry after {} seconds.",
                self.retry_after_seconds
            ),
        );

        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(error_response)).into_response();

        let value = HeaderValue::from(self.retry_after_seconds);
        let headers = response.headers_mut();
        headers.insert("retry-after", value.clone());
        headers.insert("x-ratelimit-reset", value);

        response
    }
}

// ============================================================================
// Rate Limit Middleware
// ============================================================================

/// Middleware to enforce rate limits
///
/// Runs after the auth middleware, which puts `ApiKeyInfo` in the request
/// extensions. Answers 429 with `Retry-After` when the bucket is empty.
pub async fn rate_limit(
    State(rate_state): State<RateLimitState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, RateLimitError> {
    if !rate_state.config.enabled {
        return Ok(next.run(request).await);
    }

    let Some(key_info) = request.extensions().get::<ApiKeyInfo>().cloned() else {
        tracing::warn!("Rate limit middleware: No ApiKeyInfo in extensions");
        return Ok(next.run(request).await);
    };

    let limiter = rate_state.get_limiter(&key_info).await;

    match limiter.check() {
        Ok(_) => {
            let mut response = next.run(request).await;
            response.headers_mut().insert(
                "x-ratelimit-limit",
                HeaderValue::from(rate_state.config.requests_per_window),
            );
            Ok(response)
        }
        Err(not_until) => {
            let retry_after = not_until.wait_time_from(DefaultClock::default().now());
            let retry_after_seconds = retry_after.as_secs().max(1);

            tracing::warn!(
                key = %key_info.api_key,
                retry_after_seconds = retry_after_seconds,
                "Rate limit exceeded"
            );

            Err(RateLimitError { retry_after_seconds })
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
