//! Password hashing with bcrypt.
//!
//! The work factor is fixed at 12 and is not configurable.

use crate::error::CryptoError;

/// bcrypt work factor.
pub const HASH_COST: u32 = 12;

/// Hashes a password with bcrypt at [`HASH_COST`].
///
/// Returns the modular crypt string (`$2b$12$...`). Blocking and slow.
pub fn hash_password(password: &str) -> Result<String, CryptoError> {
    bcrypt::hash(password, HASH_COST).map_err(|e| CryptoError::PasswordHash(e.to_string()))
}

/// Verifies a password against a bcrypt hash.
///
/// A mismatch is `Ok(false)`; only an unparseable hash is an error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, CryptoError> {
    bcrypt::verify(password, hash).map_err(|e| CryptoError::PasswordHash(e.to_string()))
}
