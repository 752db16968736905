//! Request and response bodies.

use serde::{Deserialize, Serialize};

use authgate_config::AppConfig;

/// `GET /health` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the service answers.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Whether setup has completed.
    pub configured: bool,
}

/// `POST /app-config` request. Blank optional fields count as absent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupRequest {
    /// Display name.
    #[serde(default)]
    pub app_name: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Logo URL.
    #[serde(default)]
    pub logo_url: Option<String>,
    /// PKCS8 PEM private key.
    #[serde(default)]
    pub private_key: Option<String>,
    /// SPKI PEM public key.
    #[serde(default)]
    pub public_key: Option<String>,
}

impl SetupRequest {
    /// Converts into a config; field validation happens in the store.
    pub fn into_config(self) -> AppConfig {
        AppConfig {
            app_name: self.app_name.unwrap_or_default(),
            description: self.description,
            logo_url: self.logo_url,
            private_key: self.private_key,
            public_key: self.public_key,
        }
    }
}

/// Generic success body.
#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    /// Always true.
    pub success: bool,
}

/// `POST /keys/generate` response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPairResponse {
    /// PKCS8 PEM private key.
    pub private_key: String,
    /// SPKI PEM public key.
    pub public_key: String,
}

/// `POST /signup` and `POST /login` request.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    /// Username.
    pub username: String,
    /// Plaintext password.
    pub password: String,
}

/// `POST /signup` and `POST /login` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Compact RS256 JWT.
    pub token: String,
}
