//! Credential store error types.

use thiserror::Error;

/// Errors that can occur in the credential store.
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// Username or password does not meet policy.
    #[error("invalid {field}: {reason}")]
    Validation {
        /// Field name as it appears on the wire.
        field: &'static str,
        /// Human readable reason.
        reason: String,
    },

    /// The username is already registered.
    #[error("username already taken: {0}")]
    UsernameTaken(String),

    /// Unknown user or wrong password. The two are never told apart.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Password hashing error.
    #[error("crypto error: {0}")]
    Crypto(String),
}

impl CredentialsError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        CredentialsError::Validation {
            field,
            reason: reason.into(),
        }
    }
}

impl From<authgate_crypto::CryptoError> for CredentialsError {
    fn from(e: authgate_crypto::CryptoError) -> Self {
        CredentialsError::Crypto(e.to_string())
    }
}

impl From<authgate_storage::StorageError> for CredentialsError {
    fn from(e: authgate_storage::StorageError) -> Self {
        CredentialsError::Storage(e.to_string())
    }
}
