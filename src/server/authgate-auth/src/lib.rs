//! # Authgate Auth
//!
//! Account signup and login on top of the config and credential stores, and
//! the RS256 session tokens they produce.
//!
//! Tokens are stateless: nothing is recorded server side, so a token stays
//! valid until its `exp` and there is no revocation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod claims;
pub mod error;
pub mod service;
pub mod verifier;

pub use claims::{Claims, IssuedToken, TOKEN_TTL_SECS};
pub use error::AuthError;
pub use service::AuthService;
pub use verifier::TokenVerifier;
