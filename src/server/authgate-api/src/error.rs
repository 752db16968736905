//! API error type and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use authgate_auth::AuthError;
use authgate_config::ConfigError;
use authgate_crypto::CryptoError;

/// Errors returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body could not be parsed.
    #[error("{0}")]
    BadRequest(String),

    /// A field failed validation.
    #[error("invalid {field}: {reason}")]
    Validation {
        /// Field name as it appears on the wire.
        field: &'static str,
        /// Human readable reason.
        reason: String,
    },

    /// Missing, invalid or expired bearer token, or bad credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Setup has already been run.
    #[error("service is already configured")]
    AlreadyConfigured,

    /// Requested resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The username is already registered.
    #[error("username already taken")]
    UsernameTaken,

    /// Setup has not stored a signing keypair yet.
    #[error("service not configured")]
    ServiceNotConfigured,

    /// Anything unexpected. The detail is logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::AlreadyConfigured => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UsernameTaken => StatusCode::CONFLICT,
            ApiError::ServiceNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human readable message.
    pub error: String,
    /// Offending field, for validation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Internal(detail) => {
                error!(error = %detail, "Request failed");
                ErrorResponse {
                    error: "internal server error".into(),
                    field: None,
                }
            },
            ApiError::Validation { field, .. } => ErrorResponse {
                error: self.to_string(),
                field: Some(*field),
            },
            other => ErrorResponse {
                error: other.to_string(),
                field: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ConfigError> for ApiError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::AlreadyExists => ApiError::AlreadyConfigured,
            ConfigError::NotFound => ApiError::NotFound("service is not configured".into()),
            ConfigError::PublicKeyNotFound => ApiError::NotFound("public key not found".into()),
            ConfigError::Validation { field, reason } => ApiError::Validation { field, reason },
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Validation { field, reason } => ApiError::Validation { field, reason },
            AuthError::UsernameTaken => ApiError::UsernameTaken,
            AuthError::InvalidCredentials | AuthError::InvalidToken | AuthError::TokenExpired => {
                ApiError::Unauthorized(e.to_string())
            },
            AuthError::ServiceNotConfigured => ApiError::ServiceNotConfigured,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<CryptoError> for ApiError {
    fn from(e: CryptoError) -> Self {
        ApiError::Internal(e.to_string())
    }
}
