use crate::{services::StoreError, validation::ValidationErrors};
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// The single error type returned by handlers.
///
/// Carries the HTTP status plus either a human-readable detail message or a
/// field-keyed validation error set.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    pub fields: Option<ValidationErrors>,
    pub retry_after: Option<u64>,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
            fields: None,
            retry_after: None,
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Missing or invalid credentials.
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    /// Authenticated, but not allowed.
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, msg)
    }

    /// 400 with a field-keyed body.
    pub fn validation(errors: ValidationErrors) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: "invalid input".into(),
            fields: Some(errors),
            retry_after: None,
        }
    }

    /// 429 with a `Retry-After` hint in seconds.
    pub fn throttled(wait_secs: u64) -> Self {
        Self {
            retry_after: Some(wait_secs),
            ..Self::new(
                StatusCode::TOO_MANY_REQUESTS,
                format!("Request was throttled. Expected available in {wait_secs} seconds."),
            )
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), "{}", self.message);
        } else {
            tracing::debug!(status = self.status.as_u16(), "{}", self.message);
        }

        let mut response = match self.fields {
            Some(fields) => (self.status, Json(fields)).into_response(),
            None => {
                let body = Json(json!({
                    "detail": self.message,
                    "status": self.status.as_u16()
                }));
                (self.status, body).into_response()
            }
        };

        if let Some(wait) = self.retry_after {
            if let Ok(value) = HeaderValue::from_str(&wait.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => AppError::not_found(err.to_string()),
            StoreError::Invalid(errors) => AppError::validation(errors),
            StoreError::Sqlx(_) | StoreError::PasswordHash(_) => AppError::internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_store_error_maps_to_404() {
        let err: AppError = StoreError::NotFound {
            entity: "Car",
            id: 7,
        }
        .into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Car 7 not found");
    }

    #[test]
    fn duplicate_review_maps_to_400_with_fields() {
        let err: AppError =
            StoreError::Invalid(ValidationErrors::single("non_field_errors", "dup")).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.fields.is_some());
    }

    #[test]
    fn throttled_sets_retry_after_header() {
        let response = AppError::throttled(12).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "12");
    }
}
