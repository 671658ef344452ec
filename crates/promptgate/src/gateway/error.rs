//! HTTP mapping of request failures
//!
//! Every failure becomes `{"error": <message>}` plus, for blocked and
//! quota failures, an `errorCode` field:
//! - validation errors: 400
//! - blocked/empty provider responses: 400 `BLOCKED_RESPONSE`
//! - quota exhaustion: 429 `QUOTA_EXCEEDED`
//! - anything else from the provider: 500

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::normalizer::{ErrorCode, NormalizationError};

pub const MISSING_GENERATE_FIELDS: &str = "Invalid request. prompt and modelName are required.";
pub const MISSING_API_KEY: &str =
    "API key is required. Set GEMINI_API_KEY environment variable or provide it in the UI.";

/// Errors returned by the JSON endpoints
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request body missing required fields; no provider call was made
    #[error("{0}")]
    Validation(String),

    /// Generation failed after reaching the provider
    #[error("{0}")]
    Normalization(#[from] NormalizationError),

    /// Non-generation provider failure (model listing)
    #[error("{0}")]
    Provider(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Normalization(e) => match e.code {
                ErrorCode::BlockedResponse => StatusCode::BAD_REQUEST,
                ErrorCode::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
                ErrorCode::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Code exposed to clients; unknown failures carry none
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            ApiError::Normalization(e) if e.code != ErrorCode::Unknown => Some(e.code),
            _ => None,
        }
    }

    /// Error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::Normalization(e) => match e.code {
                ErrorCode::BlockedResponse => "blocked",
                ErrorCode::QuotaExceeded => "quota",
                ErrorCode::Unknown => "provider",
            },
            ApiError::Provider(_) => "provider",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self.error_code() {
            Some(code) => serde_json::json!({
                "error": self.to_string(),
                "errorCode": code,
            }),
            None => serde_json::json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
