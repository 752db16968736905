//! Cryptographic error types.

use thiserror::Error;

/// Which half of a keypair an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// PKCS8 private key.
    Private,
    /// SPKI public key.
    Public,
}

impl std::fmt::Display for KeyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyKind::Private => f.write_str("private key"),
            KeyKind::Public => f.write_str("public key"),
        }
    }
}

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key generation failed.
    #[error("key generation failed: {0}")]
    KeyGenerationFailed(String),

    /// A PEM key did not parse.
    #[error("invalid {kind} format: {reason}")]
    InvalidKeyFormat {
        /// Which key failed to parse.
        kind: KeyKind,
        /// Parser message.
        reason: String,
    },

    /// Password hashing or hash parsing failed.
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}
