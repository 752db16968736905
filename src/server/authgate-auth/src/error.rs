//! Authentication error types.

use thiserror::Error;

use authgate_config::ConfigError;
use authgate_credentials::CredentialsError;

/// Errors that can occur during authentication.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Username or password does not meet policy.
    #[error("invalid {field}: {reason}")]
    Validation {
        /// Field name as it appears on the wire.
        field: &'static str,
        /// Human readable reason.
        reason: String,
    },

    /// The username is already registered.
    #[error("username already taken")]
    UsernameTaken,

    /// Unknown user or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Setup has not stored a signing keypair yet.
    #[error("service not configured")]
    ServiceNotConfigured,

    /// A stored or supplied key did not parse.
    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),

    /// Token is malformed, not RS256, or its signature does not verify.
    #[error("invalid token")]
    InvalidToken,

    /// Token has expired.
    #[error("token expired")]
    TokenExpired,

    /// Unexpected storage or crypto failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CredentialsError> for AuthError {
    fn from(e: CredentialsError) -> Self {
        match e {
            CredentialsError::Validation { field, reason } => AuthError::Validation { field, reason },
            CredentialsError::UsernameTaken(_) => AuthError::UsernameTaken,
            CredentialsError::InvalidCredentials => AuthError::InvalidCredentials,
            other => AuthError::Internal(other.to_string()),
        }
    }
}

impl From<ConfigError> for AuthError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::NotFound | ConfigError::PublicKeyNotFound => AuthError::ServiceNotConfigured,
            other => AuthError::Internal(other.to_string()),
        }
    }
}
