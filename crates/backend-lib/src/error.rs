// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
//!
//! Handlers do not surface these to the browser: a failed registration,
//! login or submission is logged and turned into a redirect to a safe page.
//! Only rendering failures fall through to [`IntoResponse`].
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use secrets_common::{Provider, UserId};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Username already taken: {0}")]
    DuplicateUsername(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("OAuth error ({provider}): {message}")]
    OAuth { provider: Provider, message: String },

    #[error("OAuth provider not configured: {0}")]
    ProviderNotConfigured(Provider),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Shorthand for an [`AppError::OAuth`] failure
    pub fn oauth(provider: Provider, message: impl Into<String>) -> Self {
        AppError::OAuth {
            provider,
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::UserNotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateUsername(_) => StatusCode::CONFLICT,
            AppError::OAuth { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::error!(error = %self, "request failed");

        // Use detailed messages in development, a bare reason in production
        let message = if cfg!(debug_assertions) {
            self.to_string()
        } else {
            status
                .canonical_reason()
                .unwrap_or("Internal Server Error")
                .to_string()
        };

        (status, message).into_response()
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Background task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};
    use uuid::Uuid;

    #[test]
    fn test_app_error_display() {
        let err = AppError::DuplicateUsername("a@x.com".to_string());
        assert_eq!(err.to_string(), "Username already taken: a@x.com");

        let err = AppError::oauth(Provider::GitHub, "state mismatch");
        assert_eq!(err.to_string(), "OAuth error (github): state mismatch");

        let err = AppError::ProviderNotConfigured(Provider::Google);
        assert_eq!(err.to_string(), "OAuth provider not configured: google");

        let io_error = AppError::Io(IoError::new(ErrorKind::NotFound, "File not found"));
        assert!(io_error.to_string().contains("IO error"));
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            AppError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::UserNotFound(Uuid::new_v4()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::DuplicateUsername("a".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Internal("test".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_from_impls() {
        let io_err = IoError::new(ErrorKind::PermissionDenied, "Permission denied");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));

        let json_err: serde_json::Error =
            serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let app_err: AppError = json_err.into();
        assert!(matches!(app_err, AppError::Json(_)));
    }

    #[test]
    fn test_app_error_into_response() {
        let response = AppError::InvalidInput("empty secret".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
