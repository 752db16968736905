//! # Authgate Config
//!
//! The service identity: display name, description, logo and the RSA keypair
//! that signs every session token.
//!
//! The identity has two states:
//! - **Uninitialized**: setup has not run, no token can be issued
//! - **Initialized**: the identity is stored and can never change
//!
//! The record lives under a single fixed storage key. Storage inserts it with
//! a create-only write, so when several setup requests race (in one process or
//! across processes sharing the database) exactly one of them wins.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod key_files;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use authgate_crypto::{error::KeyKind, CryptoError, KeyManager, KeyPair};
use authgate_storage::{StorageBackend, StorageError};

pub use error::ConfigError;
pub use key_files::KeyFiles;

/// Storage key of the singleton record.
const CONFIG_KEY: &str = "app_config/singleton";

/// Length bounds for `appName`, in characters.
const APP_NAME_MIN: usize = 2;
const APP_NAME_MAX: usize = 64;

/// Maximum length of `description`, in characters.
const DESCRIPTION_MAX: usize = 256;

/// State of the service identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigStatus {
    /// Setup has not run yet.
    Uninitialized,
    /// Identity stored; immutable from here on.
    Initialized,
}

/// The service identity and signing keypair.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Display name shown on the login and signup screens.
    pub app_name: String,
    /// Optional short description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional absolute http(s) URL of a logo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    /// PKCS8 PEM private key. Present together with `public_key` or not at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    /// SPKI PEM public key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

impl AppConfig {
    /// Creates a config with just a display name.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            description: None,
            logo_url: None,
            private_key: None,
            public_key: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the logo URL.
    pub fn with_logo_url(mut self, logo_url: impl Into<String>) -> Self {
        self.logo_url = Some(logo_url.into());
        self
    }

    /// Attaches a signing keypair.
    pub fn with_keypair(mut self, pair: &KeyPair) -> Self {
        self.private_key = Some(pair.private_key_pem().to_string());
        self.public_key = Some(pair.public_key_pem().to_string());
        self
    }

    /// Returns the keypair, if both halves are present.
    pub fn keypair(&self) -> Option<KeyPair> {
        match (&self.private_key, &self.public_key) {
            (Some(private), Some(public)) => Some(KeyPair::new(private.as_str(), public.as_str())),
            _ => None,
        }
    }

    /// Trims text fields and turns blank optional fields into `None`.
    /// PEM keys are kept byte for byte.
    fn normalized(self) -> Self {
        fn trimmed(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        fn non_blank(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }

        Self {
            app_name: self.app_name.trim().to_string(),
            description: trimmed(self.description),
            logo_url: trimmed(self.logo_url),
            private_key: non_blank(self.private_key),
            public_key: non_blank(self.public_key),
        }
    }

    /// Validates every field. Expects a normalized config.
    fn validate(&self) -> Result<(), ConfigError> {
        let name_len = self.app_name.chars().count();
        if name_len < APP_NAME_MIN || name_len > APP_NAME_MAX {
            return Err(ConfigError::validation(
                "appName",
                format!("must be {APP_NAME_MIN}-{APP_NAME_MAX} characters"),
            ));
        }

        if let Some(description) = &self.description {
            if description.chars().count() > DESCRIPTION_MAX {
                return Err(ConfigError::validation(
                    "description",
                    format!("must be at most {DESCRIPTION_MAX} characters"),
                ));
            }
        }

        if let Some(logo_url) = &self.logo_url {
            let parsed = url::Url::parse(logo_url)
                .map_err(|e| ConfigError::validation("logoUrl", e.to_string()))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::validation(
                    "logoUrl",
                    "must be an http or https URL",
                ));
            }
        }

        match (&self.private_key, &self.public_key) {
            (None, None) => {},
            (Some(_), None) => {
                return Err(ConfigError::validation(
                    "publicKey",
                    "must be supplied together with privateKey",
                ));
            },
            (None, Some(_)) => {
                return Err(ConfigError::validation(
                    "privateKey",
                    "must be supplied together with publicKey",
                ));
            },
            (Some(private), Some(public)) => {
                KeyManager::validate(&KeyPair::new(private.as_str(), public.as_str())).map_err(
                    |e| match e {
                        CryptoError::InvalidKeyFormat { kind, reason } => {
                            let field = match kind {
                                KeyKind::Private => "privateKey",
                                KeyKind::Public => "publicKey",
                            };
                            ConfigError::validation(field, reason)
                        },
                        other => ConfigError::validation("privateKey", other.to_string()),
                    },
                )?;
            },
        }

        Ok(())
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("app_name", &self.app_name)
            .field("description", &self.description)
            .field("logo_url", &self.logo_url)
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("public_key", &self.public_key)
            .finish()
    }
}

/// The parts of the config any client may see. Never carries the private key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicConfig {
    /// Display name.
    pub app_name: String,
    /// Description.
    pub description: Option<String>,
    /// Logo URL.
    pub logo_url: Option<String>,
    /// SPKI PEM public key for token verification.
    pub public_key: Option<String>,
}

/// The config store owns the singleton identity record.
pub struct ConfigStore {
    storage: Arc<dyn StorageBackend>,
    key_files: Option<KeyFiles>,
    /// The record is immutable once stored, so a loaded copy never goes stale.
    cached: RwLock<Option<AppConfig>>,
}

impl ConfigStore {
    /// Creates a config store on top of a storage backend.
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            storage,
            key_files: None,
            cached: RwLock::new(None),
        }
    }

    /// Mirrors keys to disk after setup and reads the public key back from
    /// there when the stored config has none.
    pub fn with_key_files(mut self, key_files: KeyFiles) -> Self {
        self.key_files = Some(key_files);
        self
    }

    /// Returns the current status.
    pub async fn status(&self) -> Result<ConfigStatus, ConfigError> {
        let status = if self.exists().await? {
            ConfigStatus::Initialized
        } else {
            ConfigStatus::Uninitialized
        };

        debug!(status = ?status, "Config status loaded");
        Ok(status)
    }

    /// Returns true once setup has completed.
    pub async fn exists(&self) -> Result<bool, ConfigError> {
        if self.cached.read().await.is_some() {
            return Ok(true);
        }
        Ok(self.storage.exists(CONFIG_KEY).await?)
    }

    /// Loads the config.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NotFound`] before setup.
    pub async fn load(&self) -> Result<AppConfig, ConfigError> {
        if let Some(config) = self.cached.read().await.as_ref() {
            return Ok(config.clone());
        }

        let bytes = self
            .storage
            .get(CONFIG_KEY)
            .await?
            .ok_or(ConfigError::NotFound)?;
        let config: AppConfig = serde_json::from_slice(&bytes)
            .map_err(|e| ConfigError::Serialization(e.to_string()))?;

        *self.cached.write().await = Some(config.clone());
        Ok(config)
    }

    /// Loads the config without the private key.
    pub async fn public_config(&self) -> Result<PublicConfig, ConfigError> {
        let config = self.load().await?;
        let public_key = match config.public_key {
            Some(pem) => Some(pem),
            None => self.mirrored_public_key(),
        };

        Ok(PublicConfig {
            app_name: config.app_name,
            description: config.description,
            logo_url: config.logo_url,
            public_key,
        })
    }

    /// Returns the PEM public key that verifies issued tokens.
    ///
    /// Falls back to the mirrored key file when the stored config has no key
    /// or setup has not run.
    pub async fn public_key(&self) -> Result<String, ConfigError> {
        let stored = match self.load().await {
            Ok(config) => config.public_key,
            Err(ConfigError::NotFound) => None,
            Err(e) => return Err(e),
        };

        stored
            .or_else(|| self.mirrored_public_key())
            .ok_or(ConfigError::PublicKeyNotFound)
    }

    fn mirrored_public_key(&self) -> Option<String> {
        let files = self.key_files.as_ref()?;
        match files.read_public_key() {
            Ok(pem) => pem,
            Err(e) => {
                warn!(error = %e, "Failed to read mirrored public key");
                None
            },
        }
    }

    /// Stores the config. Succeeds at most once over the lifetime of the
    /// database.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::AlreadyExists`] if setup already ran, whatever the
    ///   payload. Nothing is written.
    /// - [`ConfigError::Validation`] for a bad field or key.
    pub async fn save(&self, config: AppConfig) -> Result<(), ConfigError> {
        if self.exists().await? {
            return Err(ConfigError::AlreadyExists);
        }

        let config = config.normalized();
        config.validate()?;

        let bytes =
            serde_json::to_vec(&config).map_err(|e| ConfigError::Serialization(e.to_string()))?;

        match self.storage.create(CONFIG_KEY, &bytes).await {
            Ok(()) => {},
            Err(StorageError::AlreadyExists(_)) => {
                debug!("Lost setup race, config already stored");
                return Err(ConfigError::AlreadyExists);
            },
            Err(e) => return Err(e.into()),
        }

        info!(
            app_name = %config.app_name,
            has_keypair = config.private_key.is_some(),
            "Service config initialized"
        );

        if let (Some(files), Some(pair)) = (&self.key_files, config.keypair()) {
            match files.write(&pair) {
                Ok(()) => info!(path = %files.public_key_path().display(), "Keys mirrored to disk"),
                Err(e) => warn!(error = %e, "Failed to mirror keys to disk"),
            }
        }

        *self.cached.write().await = Some(config);
        Ok(())
    }
}
