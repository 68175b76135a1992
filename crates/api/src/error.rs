//! Unified error handling for the API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::notify::NotifyError;

/// Application-level error type for handler routes.
///
/// Every variant renders as a JSON body of the form `{"error": "..."}`;
/// `PhoneMissing` additionally sets `"needsPhoneUpdate": true` so clients can
/// steer users towards support instead of retrying.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request failed validation.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Credentials or token were rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated user lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A uniqueness guarantee was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Recovery requested for an account with no phone number on file.
    #[error("Phone number missing: {0}")]
    PhoneMissing(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Outbound notification failed. The only notification failure that
    /// reaches clients is the recovery-code send; confirmations are
    /// best-effort and swallowed by the caller.
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(self, Self::Database(_) | Self::Notify(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "API request error"
            );
        }

        let status = match &self {
            Self::Database(_) | Self::Notify(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Validation(_) | Self::Conflict(_) | Self::PhoneMissing(_) => {
                StatusCode::BAD_REQUEST
            }
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Notify(_) => "Failed to send OTP. Please try again.".to_string(),
            Self::Validation(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::PhoneMissing(msg) => msg.clone(),
        };

        let mut body = serde_json::json!({ "error": message });
        if matches!(self, Self::PhoneMissing(_)) {
            body["needsPhoneUpdate"] = serde_json::Value::Bool(true);
        }

        (status, Json(body)).into_response()
    }
}

/// Set the Sentry user context from an authenticated user.
pub fn set_sentry_user(user_id: i32, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("User not found".to_string());
        assert_eq!(err.to_string(), "Not found: User not found");

        let err = AppError::Validation("Phone number must be 10 digits".to_string());
        assert_eq!(
            err.to_string(),
            "Validation failed: Phone number must be 10 digits"
        );
    }

    #[test]
    fn test_app_error_status_codes() {
        // Test that errors map to correct HTTP status codes
        fn get_status(err: AppError) -> StatusCode {
            let response = err.into_response();
            response.status()
        }

        assert_eq!(
            get_status(AppError::Validation("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Conflict("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::PhoneMissing("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = AppError::Unauthorized("Invalid credentials".to_string()).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["error"], "Invalid credentials");
        assert!(body.get("needsPhoneUpdate").is_none());
    }

    #[tokio::test]
    async fn test_phone_missing_sets_update_flag() {
        let response = AppError::PhoneMissing("no phone on file".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["error"], "no phone on file");
        assert_eq!(body["needsPhoneUpdate"], serde_json::Value::Bool(true));
    }
}
