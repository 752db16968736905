//! # Authgate Credentials
//!
//! Username/password store. Passwords are kept only as bcrypt digests.
//!
//! ## Policy
//!
//! - Usernames match `^[a-z0-9_]{3,32}$`
//! - Passwords are 8-64 characters with at least one ASCII letter and one
//!   ASCII digit
//!
//! Failed logins never reveal whether the username exists: unknown users are
//! checked against a dummy digest so both paths cost one bcrypt verification.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;

use std::sync::OnceLock;

use tracing::{debug, info};

use authgate_crypto::password;
use authgate_storage::StorageError;
use authgate_storage_sqlite::SqliteBackend;

pub use error::CredentialsError;

/// SQL schema for the users table.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at    INTEGER NOT NULL
);
"#;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;
const PASSWORD_MIN: usize = 8;
const PASSWORD_MAX: usize = 64;

/// A registered user. The password digest never leaves the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Row id, assigned on creation.
    pub id: i64,
    /// Unique username.
    pub username: String,
    /// Creation timestamp (Unix seconds).
    pub created_at: i64,
}

/// Checks a username against `^[a-z0-9_]{3,32}$`.
pub fn validate_username(username: &str) -> Result<(), CredentialsError> {
    if username.len() < USERNAME_MIN || username.len() > USERNAME_MAX {
        return Err(CredentialsError::validation(
            "username",
            format!("must be {USERNAME_MIN}-{USERNAME_MAX} characters"),
        ));
    }

    let valid = username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if !valid {
        return Err(CredentialsError::validation(
            "username",
            "may only contain lowercase letters, digits and underscores",
        ));
    }

    Ok(())
}

/// Checks a password against the length and character-class policy.
pub fn validate_password(password: &str) -> Result<(), CredentialsError> {
    let len = password.chars().count();
    if len < PASSWORD_MIN || len > PASSWORD_MAX {
        return Err(CredentialsError::validation(
            "password",
            format!("must be {PASSWORD_MIN}-{PASSWORD_MAX} characters"),
        ));
    }

    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(CredentialsError::validation(
            "password",
            "must contain at least one letter",
        ));
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(CredentialsError::validation(
            "password",
            "must contain at least one digit",
        ));
    }

    Ok(())
}

/// Digest compared against when the username is unknown.
fn dummy_hash() -> Result<&'static str, CredentialsError> {
    static DUMMY: OnceLock<String> = OnceLock::new();
    if let Some(hash) = DUMMY.get() {
        return Ok(hash);
    }
    let hash = password::hash_password("authgate-dummy-password-0")?;
    Ok(DUMMY.get_or_init(|| hash))
}

/// Runs a bcrypt operation off the async executor.
async fn blocking<T, F>(f: F) -> Result<T, CredentialsError>
where
    F: FnOnce() -> Result<T, CredentialsError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CredentialsError::Crypto(format!("hashing task failed: {e}")))?
}

/// The credential store.
#[derive(Clone)]
pub struct CredentialStore {
    storage: SqliteBackend,
}

impl CredentialStore {
    /// Creates the store and its schema on an open database.
    pub async fn new(storage: SqliteBackend) -> Result<Self, CredentialsError> {
        let store = Self { storage };
        store.init_schema().await?;

        debug!(path = %store.storage.path().display(), "Credential store initialized");
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), CredentialsError> {
        self.storage.execute_raw(SCHEMA).await?;
        Ok(())
    }

    /// Registers a user.
    ///
    /// # Errors
    ///
    /// - [`CredentialsError::Validation`] if either input breaks policy
    /// - [`CredentialsError::UsernameTaken`] if the username exists, including
    ///   when a concurrent signup for the same name wins
    pub async fn create_user(&self, username: &str, password: &str) -> Result<User, CredentialsError> {
        validate_username(username)?;
        validate_password(password)?;

        let password = password.to_string();
        let password_hash = blocking(move || Ok(password::hash_password(&password)?)).await?;

        let row: Option<(i64, i64)> = self
            .storage
            .query_one(
                "INSERT INTO users (username, password_hash, created_at) \
                 VALUES (?, ?, CAST(strftime('%s', 'now') AS INTEGER)) \
                 RETURNING id, created_at",
                &[username, password_hash.as_str()],
            )
            .await
            .map_err(|e| match e {
                StorageError::AlreadyExists(_) => {
                    CredentialsError::UsernameTaken(username.to_string())
                },
                other => other.into(),
            })?;

        let (id, created_at) =
            row.ok_or_else(|| CredentialsError::Storage("insert returned no row".into()))?;

        info!(user_id = id, username = %username, "User created");

        Ok(User {
            id,
            username: username.to_string(),
            created_at,
        })
    }

    /// Checks a username/password pair.
    ///
    /// Unknown user, wrong password and policy-violating input all yield
    /// [`CredentialsError::InvalidCredentials`].
    pub async fn verify_user(&self, username: &str, password: &str) -> Result<User, CredentialsError> {
        let row: Option<(i64, String, i64)> =
            if validate_username(username).is_ok() && validate_password(password).is_ok() {
                self.storage
                    .query_one(
                        "SELECT id, password_hash, created_at FROM users WHERE username = ?",
                        &[username],
                    )
                    .await?
            } else {
                None
            };

        let stored_hash = match &row {
            Some((_, hash, _)) => hash.clone(),
            None => dummy_hash()?.to_string(),
        };

        let password = password.to_string();
        let matches = blocking(move || Ok(password::verify_password(&password, &stored_hash)?)).await?;

        match row {
            Some((id, _, created_at)) if matches => {
                debug!(user_id = id, "Credentials verified");
                Ok(User {
                    id,
                    username: username.to_string(),
                    created_at,
                })
            },
            _ => {
                debug!("Credential check failed");
                Err(CredentialsError::InvalidCredentials)
            },
        }
    }

    /// Looks up a user by name.
    pub async fn find_user(&self, username: &str) -> Result<Option<User>, CredentialsError> {
        let row: Option<(i64, i64)> = self
            .storage
            .query_one(
                "SELECT id, created_at FROM users WHERE username = ?",
                &[username],
            )
            .await?;

        Ok(row.map(|(id, created_at)| User {
            id,
            username: username.to_string(),
            created_at,
        }))
    }
}
