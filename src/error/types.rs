//! API error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::{ExternalServiceError, SponsorsError};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Upstream(#[from] ExternalServiceError),

    #[error("{message}")]
    ReconciliationConflict { message: String },

    #[error("Not configured: {0}")]
    NotConfigured(String),
}

impl From<SponsorsError> for ApiError {
    fn from(err: SponsorsError) -> Self {
        match err {
            SponsorsError::External(e) => ApiError::Upstream(e),
            conflict @ SponsorsError::ReconciliationConflict { .. } => {
                ApiError::ReconciliationConflict {
                    message: conflict.to_string(),
                }
            }
        }
    }
}

impl ApiError {
    /// Value of `error.type` in the response body
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Upstream(_) => "upstream_error",
            ApiError::ReconciliationConflict { .. } => "reconciliation_conflict",
            ApiError::NotConfigured(_) => "not_configured",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Upstream(_) | ApiError::ReconciliationConflict { .. } => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        }

        let body = Json(ErrorResponse::new(self.error_type(), &self.to_string()));

        (status, body).into_response()
    }
}

/// Error body shared by every endpoint and middleware:
/// `{ "type": "error", "error": { "type": ..., "message": ... } }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub type_: String,
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub type_: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            type_: "error".to_string(),
            error: ErrorDetail {
                type_: error_type.to_string(),
                message: message.to_string(),
            },
        }
    }
}
