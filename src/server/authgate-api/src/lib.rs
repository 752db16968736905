//! # Authgate API
//!
//! REST API layer for Authgate.
//!
//! ## Endpoints
//!
//! All routes live under `/auth/api`:
//!
//! - `GET  /health` - Liveness and setup status
//! - `GET  /app-config` - Public service identity
//! - `POST /app-config` - One-time setup
//! - `GET  /public-key` - PEM key for verifying tokens
//! - `POST /keys/generate` - Fresh keypair, not stored
//! - `POST /signup`, `POST /login` - Session tokens
//! - `GET  /me` - Claims of the bearer token

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
mod handlers;
pub mod types;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use authgate_auth::AuthService;
use authgate_config::ConfigStore;

pub use error::{ApiError, ErrorResponse};

/// Route prefix of the API.
pub const API_PREFIX: &str = "/auth/api";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Service identity.
    pub config: Arc<ConfigStore>,
    /// Signup, login and tokens.
    pub auth: Arc<AuthService>,
}

impl AppState {
    /// Creates handler state.
    pub fn new(config: Arc<ConfigStore>, auth: Arc<AuthService>) -> Self {
        Self { config, auth }
    }
}

/// Builds the API router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/app-config",
            get(handlers::get_app_config).post(handlers::setup_app_config),
        )
        .route("/public-key", get(handlers::public_key))
        .route("/keys/generate", post(handlers::generate_keypair))
        .route("/signup", post(handlers::signup))
        .route("/login", post(handlers::login))
        .route("/me", get(handlers::me))
        .with_state(state);

    Router::new().nest(API_PREFIX, api)
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    use authgate_credentials::CredentialStore;
    use authgate_crypto::{KeyManager, KeyPair};
    use authgate_storage_sqlite::SqliteBackend;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_keypair() -> KeyPair {
        static PAIR: OnceLock<KeyPair> = OnceLock::new();
        PAIR.get_or_init(|| KeyManager::generate().unwrap()).clone()
    }

    async fn test_router() -> (TempDir, Router) {
        let tmp = TempDir::new().unwrap();
        let backend = SqliteBackend::open(tmp.path(), "authgate").await.unwrap();
        let config = Arc::new(ConfigStore::new(Arc::new(backend.clone())));
        let credentials = CredentialStore::new(backend).await.unwrap();
        let auth = Arc::new(AuthService::new(Arc::clone(&config), credentials));
        (tmp, router(AppState::new(config, auth)))
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn get_json(router: &Router, path: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(format!("{API_PREFIX}{path}"))
            .body(Body::empty())
            .unwrap();
        let (status, bytes) = send(router, request).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn post_json(router: &Router, path: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(format!("{API_PREFIX}{path}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, bytes) = send(router, request).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn configure(router: &Router) {
        let pair = test_keypair();
        let (status, _) = post_json(
            router,
            "/app-config",
            json!({
                "appName": "Acme",
                "description": "Acme identity",
                "logoUrl": "",
                "privateKey": pair.private_key_pem(),
                "publicKey": pair.public_key_pem(),
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_reports_configuration() {
        let (_tmp, router) = test_router().await;

        let (status, body) = get_json(&router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["configured"], false);

        configure(&router).await;

        let (_, body) = get_json(&router, "/health").await;
        assert_eq!(body["configured"], true);
    }

    #[tokio::test]
    async fn test_app_config_not_found_before_setup() {
        let (_tmp, router) = test_router().await;

        let (status, body) = get_json(&router, "/app-config").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_setup_once() {
        let (_tmp, router) = test_router().await;
        configure(&router).await;

        let (status, body) = get_json(&router, "/app-config").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["appName"], "Acme");
        assert_eq!(body["description"], "Acme identity");
        assert!(body["logoUrl"].is_null());
        assert_eq!(body["publicKey"], test_keypair().public_key_pem());
        assert!(body.get("privateKey").is_none());

        let (status, _) = post_json(&router, "/app-config", json!({ "appName": "Other" })).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, body) = get_json(&router, "/app-config").await;
        assert_eq!(body["appName"], "Acme");
    }

    #[tokio::test]
    async fn test_setup_validation_error() {
        let (_tmp, router) = test_router().await;

        let (status, body) = post_json(&router, "/app-config", json!({ "appName": "A" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "appName");

        let (status, body) = post_json(
            &router,
            "/app-config",
            json!({ "appName": "Acme", "privateKey": test_keypair().private_key_pem() }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "publicKey");
    }

    #[tokio::test]
    async fn test_setup_malformed_body() {
        let (_tmp, router) = test_router().await;

        let request = Request::builder()
            .method("POST")
            .uri(format!("{API_PREFIX}/app-config"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, bytes) = send(&router, request).await;
        let body: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_public_key_plain_text() {
        let (_tmp, router) = test_router().await;

        let (status, _) = get_json(&router, "/public-key").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        configure(&router).await;

        let request = Request::builder()
            .uri(format!("{API_PREFIX}/public-key"))
            .body(Body::empty())
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/plain"));

        let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        assert_eq!(std::str::from_utf8(&bytes).unwrap(), test_keypair().public_key_pem());
    }

    #[tokio::test]
    async fn test_generate_keypair_not_persisted() {
        let (_tmp, router) = test_router().await;

        let (status, body) = post_json(&router, "/keys/generate", json!({})).await;
        assert_eq!(status, StatusCode::OK);

        let pair = KeyPair::new(
            body["privateKey"].as_str().unwrap(),
            body["publicKey"].as_str().unwrap(),
        );
        KeyManager::validate(&pair).unwrap();

        let (_, health) = get_json(&router, "/health").await;
        assert_eq!(health["configured"], false);
    }

    #[tokio::test]
    async fn test_signup_before_setup_unavailable() {
        let (_tmp, router) = test_router().await;

        let (status, _) = post_json(
            &router,
            "/signup",
            json!({ "username": "bob001", "password": "Secret99" }),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_signup_login_me() {
        let (_tmp, router) = test_router().await;
        configure(&router).await;

        let credentials = json!({ "username": "alice1", "password": "Passw0rd1" });

        let (status, body) = post_json(&router, "/signup", credentials.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].is_string());

        let (status, body) = post_json(&router, "/signup", credentials.clone()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].is_string());

        let (status, body) = post_json(&router, "/login", credentials).await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap().to_string();

        let request = Request::builder()
            .uri(format!("{API_PREFIX}/me"))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (status, bytes) = send(&router, request).await;
        let claims: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(claims["username"], "alice1");
        assert_eq!(
            claims["exp"].as_u64().unwrap() - claims["iat"].as_u64().unwrap(),
            604_800
        );
    }

    #[tokio::test]
    async fn test_login_failures() {
        let (_tmp, router) = test_router().await;
        configure(&router).await;

        post_json(
            &router,
            "/signup",
            json!({ "username": "alice1", "password": "Passw0rd1" }),
        )
        .await;

        let (status, wrong) = post_json(
            &router,
            "/login",
            json!({ "username": "alice1", "password": "wrong000" }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, unknown) = post_json(
            &router,
            "/login",
            json!({ "username": "nobody", "password": "Passw0rd1" }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong, unknown);

        let (status, body) = post_json(&router, "/login", json!({ "username": "alice1" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = post_json(
            &router,
            "/login",
            json!({ "username": "Alice!", "password": "Passw0rd1" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "username");
    }

    #[tokio::test]
    async fn test_me_rejects_bad_tokens() {
        let (_tmp, router) = test_router().await;
        configure(&router).await;

        let (status, _) = get_json(&router, "/me").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .uri(format!("{API_PREFIX}/me"))
            .header(header::AUTHORIZATION, "Bearer not.a.token")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&router, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
