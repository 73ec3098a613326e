use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend not configured")]
    Unconfigured,

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),

    #[error("Backend request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Redis command failed: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Backend replied with error: {0}")]
    Remote(String),

    #[error("Malformed backend reply: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Invalid payment provider URL: {0}")]
    InvalidUrl(String),

    #[error("Payment provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Payment provider replied with status {0}")]
    Status(u16),
}

#[derive(Error, Debug)]
pub enum RegisterError {
    #[error("Session id must be a non-empty string")]
    InvalidInput,

    #[error("Session {0} is not paid")]
    Unpaid(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(#[from] BackendError),

    #[error("Payment verification unavailable: {0}")]
    VerificationUnavailable(#[from] VerifyError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Backend setup failed: {0}")]
    Backend(#[from] BackendError),

    #[error("Payment verifier setup failed: {0}")]
    Verifier(#[from] VerifyError),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("session_id required")]
    MalformedPayload,

    #[error("Unexpected failure: {0}")]
    UnexpectedFailure(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::MalformedPayload => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": self.to_string() })),
            )
                .into_response(),
            AppError::UnexpectedFailure { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "count": 0, "ok": false })),
            )
                .into_response(),
        }
    }
}
