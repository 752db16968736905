//! # Authgate Crypto
//!
//! Core cryptographic primitives for Authgate.
//!
//! This crate provides:
//! - RSA-2048 keypair generation and PEM validation (PKCS8 / SPKI)
//! - Password hashing (bcrypt, cost 12)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod keypair;
pub mod password;

pub use error::CryptoError;
pub use keypair::{KeyManager, KeyPair};
