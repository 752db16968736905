//! # Authgate Storage
//!
//! Storage abstraction layer for Authgate backends.
//!
//! Provides the backend trait and the error type shared by every
//! storage implementation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod error;

pub use backend::StorageBackend;
pub use error::StorageError;
