//! RSA keypair generation and validation.
//!
//! Keys travel as PEM text: the private half as PKCS8 (`BEGIN PRIVATE KEY`),
//! the public half as SPKI (`BEGIN PUBLIC KEY`). These are the encodings
//! RS256 JWT libraries expect on both the signing and the verifying side.

use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, KeyKind};

/// RSA modulus size in bits.
pub const RSA_KEY_BITS: usize = 2048;

/// A PEM-encoded RSA keypair.
///
/// The PEM strings are wiped from memory when the pair is dropped and the
/// private key never shows up in `Debug` output.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyPair {
    private_key: String,
    public_key: String,
}

impl KeyPair {
    /// Wraps existing PEM strings. No validation is performed here; see
    /// [`KeyManager::validate`].
    pub fn new(private_key: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            private_key: private_key.into(),
            public_key: public_key.into(),
        }
    }

    /// Returns the PKCS8 PEM private key.
    pub fn private_key_pem(&self) -> &str {
        &self.private_key
    }

    /// Returns the SPKI PEM public key.
    pub fn public_key_pem(&self) -> &str {
        &self.public_key
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("private_key", &"[REDACTED]")
            .field("public_key", &self.public_key)
            .finish()
    }
}

/// Generates and structurally validates RSA keypairs.
///
/// Stateless: nothing generated or validated here is retained.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyManager;

impl KeyManager {
    /// Generates a fresh RSA-2048 keypair.
    ///
    /// CPU-bound and slow (tens to hundreds of milliseconds); async callers
    /// should run it on a blocking thread.
    pub fn generate() -> Result<KeyPair, CryptoError> {
        let private = RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS)
            .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;
        let public = RsaPublicKey::from(&private);

        let private_pem = private
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CryptoError::KeyGenerationFailed(format!("PKCS8 encoding failed: {e}")))?;
        let public_pem = public
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::KeyGenerationFailed(format!("SPKI encoding failed: {e}")))?;

        Ok(KeyPair::new(private_pem.as_str(), public_pem))
    }

    /// Checks that both halves parse: private as PKCS8, public as SPKI.
    ///
    /// This does not check that the two keys belong together. A mismatched
    /// pair passes and would later sign tokens the stored public key cannot
    /// verify.
    pub fn validate(pair: &KeyPair) -> Result<(), CryptoError> {
        Self::validate_private_key(pair.private_key_pem())?;
        Self::validate_public_key(pair.public_key_pem())?;
        Ok(())
    }

    /// Checks that a PEM string is a PKCS8 RSA private key.
    pub fn validate_private_key(pem: &str) -> Result<(), CryptoError> {
        RsaPrivateKey::from_pkcs8_pem(pem.trim()).map_err(|e| CryptoError::InvalidKeyFormat {
            kind: KeyKind::Private,
            reason: e.to_string(),
        })?;
        Ok(())
    }

    /// Checks that a PEM string is an SPKI RSA public key.
    pub fn validate_public_key(pem: &str) -> Result<(), CryptoError> {
        RsaPublicKey::from_public_key_pem(pem.trim()).map_err(|e| {
            CryptoError::InvalidKeyFormat {
                kind: KeyKind::Public,
                reason: e.to_string(),
            }
        })?;
        Ok(())
    }
}
