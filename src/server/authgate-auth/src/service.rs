//! Signup, login and token issuance.

use std::sync::Arc;

use jsonwebtoken::{encode, get_current_timestamp, Algorithm, EncodingKey, Header};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use authgate_config::ConfigStore;
use authgate_credentials::{validate_password, validate_username, CredentialStore};

use crate::{AuthError, Claims, IssuedToken, TokenVerifier};

/// The authentication service.
///
/// Tokens can only be issued once setup has stored a signing keypair.
pub struct AuthService {
    config: Arc<ConfigStore>,
    credentials: CredentialStore,
    /// The config never changes after setup, so the parsed key is kept.
    signing_key: OnceCell<EncodingKey>,
}

impl AuthService {
    /// Creates a new authentication service.
    pub fn new(config: Arc<ConfigStore>, credentials: CredentialStore) -> Self {
        Self {
            config,
            credentials,
            signing_key: OnceCell::new(),
        }
    }

    /// Registers a user and returns a session token.
    ///
    /// The signing key is checked before the account is inserted so an
    /// unconfigured service never creates accounts.
    ///
    /// # Errors
    ///
    /// `Validation`, `ServiceNotConfigured` or `UsernameTaken`, in that order
    /// of precedence.
    pub async fn signup(&self, username: &str, password: &str) -> Result<IssuedToken, AuthError> {
        validate_username(username)?;
        validate_password(password)?;

        self.signing_key().await?;

        let user = self.credentials.create_user(username, password).await?;
        info!(user_id = user.id, username = %user.username, "User signed up");

        self.issue_token(&user.username).await
    }

    /// Checks credentials and returns a session token.
    ///
    /// # Errors
    ///
    /// `Validation`, `ServiceNotConfigured` or `InvalidCredentials`, in that
    /// order of precedence.
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AuthError> {
        validate_username(username)?;
        validate_password(password)?;

        self.signing_key().await?;

        let user = self.credentials.verify_user(username, password).await?;
        info!(user_id = user.id, username = %user.username, "User logged in");

        self.issue_token(&user.username).await
    }

    /// Signs a token for `username`, valid for seven days from now.
    pub async fn issue_token(&self, username: &str) -> Result<IssuedToken, AuthError> {
        let key = self.signing_key().await?;
        let claims = Claims::new(username, get_current_timestamp());

        let token = encode(&Header::new(Algorithm::RS256), &claims, key)
            .map_err(|e| AuthError::Internal(format!("token signing failed: {e}")))?;

        debug!(username = %username, exp = claims.exp, "Token issued");
        Ok(IssuedToken { token, claims })
    }

    /// Returns a verifier for the configured public key.
    pub async fn verifier(&self) -> Result<TokenVerifier, AuthError> {
        let pem = self.config.public_key().await?;
        TokenVerifier::from_public_key_pem(&pem)
    }

    async fn signing_key(&self) -> Result<&EncodingKey, AuthError> {
        self.signing_key
            .get_or_try_init(|| async {
                let config = self.config.load().await?;
                let pem = config.private_key.ok_or(AuthError::ServiceNotConfigured)?;
                EncodingKey::from_rsa_pem(pem.as_bytes())
                    .map_err(|e| AuthError::InvalidKeyFormat(e.to_string()))
            })
            .await
    }
}
