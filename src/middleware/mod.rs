//! Middleware module
//!
//! Contains HTTP middleware for authentication, rate limiting, logging, and metrics.

pub mod auth;
pub mod logging;
pub mod metrics;
pub mod rate_limit;

// Re-export commonly used items
pub use auth::{require_api_key, ApiKeyInfo, AuthError, AuthState, KeySource};
pub use logging::{log_request, RequestId, REQUEST_ID_HEADER};
pub use metrics::{metrics_handler, track_metrics, Metrics};
pub use rate_limit::{rate_limit, RateLimitError, RateLimitState};
