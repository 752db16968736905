//! Token verification against a public key.
//!
//! Anyone holding the service's public key can verify a session token without
//! talking to the service.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::{AuthError, Claims};

/// Verifies RS256 session tokens.
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Creates a verifier from an SPKI PEM public key.
    pub fn from_public_key_pem(pem: &str) -> Result<Self, AuthError> {
        let decoding_key = DecodingKey::from_rsa_pem(pem.trim().as_bytes())
            .map_err(|e| AuthError::InvalidKeyFormat(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            decoding_key,
            validation,
        })
    }

    /// Verifies the signature and expiry and returns the claims.
    ///
    /// # Errors
    ///
    /// - [`AuthError::TokenExpired`] once `exp` has passed
    /// - [`AuthError::InvalidToken`] for anything else: bad signature, wrong
    ///   algorithm, malformed token or payload
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token.trim(), &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            },
        )?;

        Ok(data.claims)
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("algorithm", &Algorithm::RS256)
            .finish_non_exhaustive()
    }
}
