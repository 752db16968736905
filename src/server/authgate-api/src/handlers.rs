//! Route handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum::Json;
use tracing::{debug, info};

use authgate_auth::Claims;
use authgate_config::PublicConfig;
use authgate_crypto::KeyManager;

use crate::types::{
    CredentialsRequest, HealthResponse, KeyPairResponse, SetupRequest, SuccessResponse,
    TokenResponse,
};
use crate::{ApiError, AppState};

/// Unwraps a JSON body, turning every rejection into a 400.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let configured = state.config.exists().await?;

    Ok(Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        configured,
    }))
}

/// `GET /app-config`
pub async fn get_app_config(
    State(state): State<AppState>,
) -> Result<Json<PublicConfig>, ApiError> {
    Ok(Json(state.config.public_config().await?))
}

/// `POST /app-config`
pub async fn setup_app_config(
    State(state): State<AppState>,
    payload: Result<Json<SetupRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let request = json_body(payload)?;

    state.config.save(request.into_config()).await?;

    info!("Setup completed");
    Ok(Json(SuccessResponse { success: true }))
}

/// `GET /public-key`, as `text/plain` PEM.
pub async fn public_key(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let pem = state.config.public_key().await?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], pem))
}

/// `POST /keys/generate`. The pair is returned, not stored.
pub async fn generate_keypair() -> Result<Json<KeyPairResponse>, ApiError> {
    let pair = tokio::task::spawn_blocking(KeyManager::generate)
        .await
        .map_err(|e| ApiError::Internal(format!("key generation task failed: {e}")))??;

    debug!("Keypair generated");
    Ok(Json(KeyPairResponse {
        private_key: pair.private_key_pem().to_string(),
        public_key: pair.public_key_pem().to_string(),
    }))
}

/// `POST /signup`
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let request = json_body(payload)?;
    let issued = state.auth.signup(&request.username, &request.password).await?;

    Ok(Json(TokenResponse {
        token: issued.token,
    }))
}

/// `POST /login`
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let request = json_body(payload)?;
    let issued = state.auth.login(&request.username, &request.password).await?;

    Ok(Json(TokenResponse {
        token: issued.token,
    }))
}

/// `GET /me`: claims of the bearer token.
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Claims>, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".into()))?;

    let claims = state.auth.verifier().await?.verify(token)?;
    Ok(Json(claims))
}
