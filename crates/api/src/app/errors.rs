use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use stockroom_core::{DomainError, FieldViolation};

/// Error body shared by every failing endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub error: &'static str,
    pub message: String,
    pub timestamp: String,
    pub path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub field_errors: Vec<FieldViolation>,
}

pub fn domain_error_to_response(err: DomainError, path: &str) -> axum::response::Response {
    match err {
        DomainError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "Product Not Found", msg, path),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "Conflict", msg, path),
        DomainError::InvalidState(msg) => json_error(StatusCode::CONFLICT, "Invalid State", msg, path),
        DomainError::InvalidId(msg) => {
            json_error(StatusCode::BAD_REQUEST, "Validation Failed", msg, path)
        }
        DomainError::Validation { message, violations } => with_field_errors(
            StatusCode::BAD_REQUEST,
            "Validation Failed",
            message,
            path,
            violations,
        ),
        DomainError::Internal(detail) => {
            tracing::error!(path, error = %detail, "internal error");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                "an unexpected error occurred",
                path,
            )
        }
    }
}

pub fn json_error(
    status: StatusCode,
    error: &'static str,
    message: impl Into<String>,
    path: &str,
) -> axum::response::Response {
    with_field_errors(status, error, message, path, Vec::new())
}

fn with_field_errors(
    status: StatusCode,
    error: &'static str,
    message: impl Into<String>,
    path: &str,
    field_errors: Vec<FieldViolation>,
) -> axum::response::Response {
    let body = ErrorResponse {
        status: status.as_u16(),
        error,
        message: message.into(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        path: path.to_string(),
        field_errors,
    };
    (status, axum::Json(body)).into_response()
}

/// Malformed bodies or query strings surface as validation failures.
pub fn rejection_to_response(rejection: impl std::fmt::Display, path: &str) -> axum::response::Response {
    json_error(
        StatusCode::BAD_REQUEST,
        "Validation Failed",
        rejection.to_string(),
        path,
    )
}
