use crate::auth::AuthError;
use crate::config::Environment;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use itinera_service::{FieldError, ServiceError};
use jiff::Timestamp;
use serde::Serialize;
use std::fmt::Display;
use tracing::error;

pub type Result<T> = std::result::Result<T, ApiError>;

pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
pub const FORBIDDEN: &str = "FORBIDDEN";
pub const NOT_FOUND: &str = "NOT_FOUND";

/// An error response in the common `{success: false, ...}` envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    code: Option<&'static str>,
    errors: Vec<FieldError>,
    detail: Option<String>,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>, code: Option<&'static str>) -> Self {
        Self {
            status,
            message: message.into(),
            code,
            errors: Vec::new(),
            detail: None,
        }
    }

    pub fn validation(errors: Vec<FieldError>) -> Self {
        Self {
            errors,
            ..Self::new(
                StatusCode::BAD_REQUEST,
                "Validation failed",
                Some(VALIDATION_ERROR),
            )
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message, Some(UNAUTHORIZED))
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "Access denied", Some(FORBIDDEN))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message, Some(NOT_FOUND))
    }

    pub fn route_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Route not found", None)
    }

    /// A 500 with a generic message. The cause is logged, and only echoed
    /// back when the environment allows it.
    pub fn internal(message: &'static str, cause: &dyn Display, environment: Environment) -> Self {
        error!(error = %cause, "{message}");
        Self {
            detail: environment
                .exposes_error_detail()
                .then(|| cause.to_string()),
            ..Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, None)
        }
    }

    /// Maps a service failure; `action` is the generic "Failed to ..."
    /// message used for server errors.
    pub fn from_service(err: ServiceError, action: &'static str, environment: Environment) -> Self {
        match err {
            ServiceError::NotFound => Self::not_found("Itinerary not found"),
            ServiceError::AccessDenied => Self::forbidden(),
            ServiceError::Validation(errors) => Self::validation(errors),
            ServiceError::ShareUnavailable | ServiceError::Storage(_) => {
                Self::internal(action, &err, environment)
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::unauthorized(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    message: &'a str,
    timestamp: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a [FieldError]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            message: &self.message,
            timestamp: Timestamp::now(),
            errors: (!self.errors.is_empty()).then_some(self.errors.as_slice()),
            code: self.code,
            detail: self.detail.as_deref(),
        };
        (self.status, Json(body)).into_response()
    }
}
