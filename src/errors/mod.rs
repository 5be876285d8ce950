/// Unified error handling module
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Unified error envelope
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            details: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("External API error: {0}")]
    ExternalApi(#[from] reqwest::Error),
    #[error("{source_name} responded with status {status}")]
    UpstreamStatus { source_name: String, status: u16 },
    #[error("Unparseable payload from {source_name}: {message}")]
    Payload { source_name: String, message: String },
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Daily quota exhausted")]
    QuotaExhausted,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn payload(source_name: &str, message: impl Into<String>) -> Self {
        ApiError::Payload {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("Unauthorized cron request"),
            ),
            ApiError::QuotaExhausted => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorResponse::new("Daily free question limit reached"),
            ),
            ApiError::InvalidInput(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    success: false,
                    error: "Invalid request".to_string(),
                    details: Some(msg.clone()),
                },
            ),
            other => {
                // Detail stays in the server log.
                error!("Request failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Request could not be completed"),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
