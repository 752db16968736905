//! Session token claims.

use serde::{Deserialize, Serialize};

/// Token lifetime: seven days.
pub const TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Payload of an Authgate session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated username.
    pub username: String,
    /// Issued at (Unix seconds).
    pub iat: u64,
    /// Expiration (Unix seconds), always `iat + TOKEN_TTL_SECS` when issued here.
    pub exp: u64,
}

impl Claims {
    /// Claims for a token issued at `iat`.
    pub fn new(username: impl Into<String>, iat: u64) -> Self {
        Self {
            username: username.into(),
            iat,
            exp: iat + TOKEN_TTL_SECS,
        }
    }
}

/// A signed token and the claims it carries.
#[derive(Clone)]
pub struct IssuedToken {
    /// Compact JWT.
    pub token: String,
    /// Decoded payload.
    pub claims: Claims,
}

impl std::fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token", &"[REDACTED]")
            .field("claims", &self.claims)
            .finish()
    }
}
