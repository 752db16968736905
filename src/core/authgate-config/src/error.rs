//! Config store error types.

use thiserror::Error;

/// Errors that can occur in the config store.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The service identity has already been set up. It cannot be replaced.
    #[error("config already exists")]
    AlreadyExists,

    /// Setup has not been run yet.
    #[error("config not found")]
    NotFound,

    /// No public key is stored or mirrored.
    #[error("public key not found")]
    PublicKeyNotFound,

    /// A field failed validation.
    #[error("invalid {field}: {reason}")]
    Validation {
        /// Field name as it appears on the wire.
        field: &'static str,
        /// Human readable reason.
        reason: String,
    },

    /// Stored record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),
}

impl ConfigError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Validation {
            field,
            reason: reason.into(),
        }
    }
}

impl From<authgate_storage::StorageError> for ConfigError {
    fn from(e: authgate_storage::StorageError) -> Self {
        ConfigError::Storage(e.to_string())
    }
}
