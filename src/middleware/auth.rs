//! Authentication middleware
//!
//! API key authentication for the sponsors endpoint. Keys come from the
//! `API_KEYS` list or the ephemeral key generated at startup.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::config::Settings;
use crate::error::ErrorResponse;

// ============================================================================
// API Key Info
// ============================================================================

/// Where an accepted key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeySource {
    Configured,
    Ephemeral,
    /// Authentication is disabled
    Anonymous,
}

/// Information about the authenticated caller
///
/// Injected into request extensions after successful authentication.
#[derive(Clone, Serialize)]
pub struct ApiKeyInfo {
    /// The API key, truncated for logs
    pub api_key: String,
    pub source: KeySource,
    /// Full key, identifies the caller's rate limit bucket
    #[serde(skip)]
    full_key: String,
}

impl ApiKeyInfo {
    pub fn new(api_key: &str, source: KeySource) -> Self {
        Self {
            api_key: Self::truncate_key(api_key),
            source,
            full_key: api_key.to_string(),
        }
    }

    pub fn anonymous() -> Self {
        Self {
            api_key: "anonymous".to_string(),
            source: KeySource::Anonymous,
            full_key: "anonymous".to_string(),
        }
    }

    /// Key of the caller's rate limit bucket. Never log it.
    pub fn bucket_key(&self) -> &str {
        &self.full_key
    }

    /// Show the first 8 chars of long keys only
    fn truncate_key(key: &str) -> String {
        if key.chars().count() > 12 {
            format!("{}...", key.chars().take(8).collect::<String>())
        } else {
            key.to_string()
        }
    }
}

impl std::fmt::Debug for ApiKeyInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyInfo")
            .field("api_key", &self.api_key)
            .field("source", &self.source)
            .finish()
    }
}

// ============================================================================
// Authentication Errors
// ============================================================================

#[derive(Debug)]
pub enum AuthError {
    /// No API key provided in request
    MissingApiKey,
    /// API key is not one of the accepted keys
    InvalidApiKey,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingApiKey => {
                "Missing API key. Include 'x-api-key' or 'Authorization: Bearer <key>' header in your request."
            }
            AuthError::InvalidApiKey => "Invalid API key. Please check your API key and try again.",
        };

        let error_response = ErrorResponse::new("authentication_error", message);
        (StatusCode::UNAUTHORIZED, Json(error_response)).into_response()
    }
}

// ============================================================================
// Authentication Middleware
// ============================================================================

/// Authentication state required by the middleware
#[derive(Clone)]
pub struct AuthState {
    pub settings: Arc<Settings>,
}

impl AuthState {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    fn identify(&self, api_key: &str) -> Option<KeySource> {
        if self.settings.api_keys.iter().any(|k| k == api_key) {
            return Some(KeySource::Configured);
        }
        match self.settings.ephemeral_api_key.as_deref() {
            Some(ephemeral) if ephemeral == api_key => Some(KeySource::Ephemeral),
            _ => None,
        }
    }
}

/// Middleware to require API key authentication
///
/// Injects `ApiKeyInfo` into request extensions on success; answers 401 when
/// the key is missing or unknown.
pub async fn require_api_key(
    State(auth_state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    if !auth_state.settings.require_api_key {
        request.extensions_mut().insert(ApiKeyInfo::anonymous());
        return Ok(next.run(request).await);
    }

    let Some(api_key) = extract_api_key(&request) else {
        tracing::warn!("Request missing API key (x-api-key or Authorization: Bearer)");
        return Err(AuthError::MissingApiKey);
    };

    match auth_state.identify(&api_key) {
        Some(source) => {
            let info = ApiKeyInfo::new(&api_key, source);
            tracing::debug!(key = %info.api_key, source = ?source, "API key authenticated");
            request.extensions_mut().insert(info);
            Ok(next.run(request).await)
        }
        None => {
            tracing::warn!(key = %ApiKeyInfo::truncate_key(&api_key), "Invalid API key");
            Err(AuthError::InvalidApiKey)
        }
    }
}

// ============================================================================
// Extension Extraction
// ============================================================================

/// Extract API key from request headers
///
/// Supports both `x-api-key` and `Authorization: Bearer`.
pub fn extract_api_key<B>(request: &Request<B>) -> Option<String> {
    request
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .or_else(|| {
            request
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
                .map(|s| s.to_string())
        })
}

// ============================================================================
// Tests
// ============================================================================
