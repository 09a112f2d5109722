use axum::{
    http::StatusCode,
    response::{IntoResponse, Response, Json},
};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    UnsupportedFormat(String),
    FileTooLarge(String),
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    IllegalTransition(String),
    StoreUnavailable(String),
    ServiceUnavailable(String),
    Storage(String),
    InternalServerError(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            AppError::UnsupportedFormat(m)
            | AppError::FileTooLarge(m)
            | AppError::BadRequest(m)
            | AppError::Unauthorized(m)
            | AppError::NotFound(m)
            | AppError::IllegalTransition(m)
            | AppError::StoreUnavailable(m)
            | AppError::ServiceUnavailable(m)
            | AppError::Storage(m)
            | AppError::InternalServerError(m) => m,
        };
        write!(f, "{}", msg)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::UnsupportedFormat(msg) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, msg),
            AppError::FileTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::IllegalTransition(msg) => (StatusCode::CONFLICT, msg),
            AppError::StoreUnavailable(msg) => {
                tracing::error!("State store unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "State store unavailable".to_string())
            }
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal server error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<crate::services::store::StoreError> for AppError {
    fn from(err: crate::services::store::StoreError) -> Self {
        AppError::StoreUnavailable(err.0)
    }
}

/// Failures inside the background pipeline. The `Display` output of a variant
/// becomes the `error` metadata written to the transaction's terminal record,
/// so every message has to make sense to a client polling the status endpoint.
#[derive(Debug)]
pub enum ProcessError {
    Decode(String),
    DurationExceeded { actual: f64, max: f64 },
    Resample(String),
    Storage(String),
    Classifier(String),
    Timeout(u64),
}

impl std::fmt::Display for ProcessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessError::Decode(msg) => write!(f, "Failed to decode audio: {}", msg),
            ProcessError::DurationExceeded { actual, max } => write!(
                f,
                "Audio duration ({:.2}s) exceeds maximum allowed duration ({:.0}s)",
                actual, max
            ),
            ProcessError::Resample(msg) => write!(f, "Failed to resample audio: {}", msg),
            ProcessError::Storage(msg) => write!(f, "Failed to store processed audio: {}", msg),
            ProcessError::Classifier(msg) => write!(f, "Classifier failed: {}", msg),
            ProcessError::Timeout(secs) => write!(f, "Processing timed out after {}s", secs),
        }
    }
}
