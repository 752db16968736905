//! Integration tests for the Authgate server.
//!
//! Each test spawns the server binary on its own port and data directory and
//! drives it over HTTP.

// Allow unwrap() in tests - panics are acceptable for test assertions
#![allow(clippy::disallowed_methods)]

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub configured: bool,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupRequest {
    pub app_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPairResponse {
    pub private_key: String,
    pub public_key: String,
}

/// Status code and JSON body of a response.
#[derive(Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

// ============================================================================
// Test Server
// ============================================================================

/// A server process bound to a data directory it does not own.
pub struct TestServer {
    process: Child,
    pub base_url: String,
    pub port: u16,
}

impl TestServer {
    /// Start a server on `port` using `data_dir`, optionally mirroring keys.
    pub async fn start(port: u16, data_dir: &Path, keys_dir: Option<&Path>) -> Result<Self> {
        let server_binary = find_server_binary()?;

        let mut command = Command::new(&server_binary);
        command
            .arg("--data-dir")
            .arg(data_dir)
            .arg("--bind")
            .arg(format!("127.0.0.1:{}", port))
            .env_remove("AUTHGATE_KEYS_DIR")
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        if let Some(dir) = keys_dir {
            command.arg("--keys-dir").arg(dir);
        }

        let process = command
            .spawn()
            .with_context(|| format!("Failed to start server: {:?}", server_binary))?;

        let server = Self {
            process,
            base_url: format!("http://127.0.0.1:{}", port),
            port,
        };

        server.wait_for_ready().await?;

        Ok(server)
    }

    /// Wait for the server to be ready to accept connections.
    async fn wait_for_ready(&self) -> Result<()> {
        let client = Client::new();
        let url = format!("{}/auth/api/health", self.base_url);

        for _ in 0..100 {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                _ => tokio::time::sleep(Duration::from_millis(100)).await,
            }
        }

        bail!("Server failed to start within 10 seconds")
    }

    /// Get an HTTP client for this server.
    pub fn client(&self) -> AuthgateClient {
        AuthgateClient::new(&self.base_url)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

/// Find the server binary in the target directory.
fn find_server_binary() -> Result<PathBuf> {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());

    // Try debug build first, then release
    let candidates = [
        Path::new(&manifest_dir).join("../../target/debug/authgate-server"),
        Path::new(&manifest_dir).join("../../target/debug/authgate-server.exe"),
        Path::new(&manifest_dir).join("../../target/release/authgate-server"),
        Path::new(&manifest_dir).join("../../target/release/authgate-server.exe"),
    ];

    for candidate in &candidates {
        if candidate.exists() {
            return Ok(candidate.canonicalize()?);
        }
    }

    bail!(
        "Could not find authgate-server binary. Run 'cargo build -p authgate-server' first. Searched in: {:?}",
        candidates
    )
}

// ============================================================================
// Test Client
// ============================================================================

/// HTTP client for testing the Authgate API.
pub struct AuthgateClient {
    client: Client,
    base_url: String,
}

impl AuthgateClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/api{}", self.base_url, path)
    }

    async fn into_api_response(resp: reqwest::Response) -> Result<ApiResponse> {
        let status = resp.status();
        let text = resp.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok(ApiResponse { status, body })
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let resp = self.client.get(self.url("/health")).send().await?;
        Ok(resp.json().await?)
    }

    pub async fn app_config(&self) -> Result<ApiResponse> {
        let resp = self.client.get(self.url("/app-config")).send().await?;
        Self::into_api_response(resp).await
    }

    pub async fn setup(&self, req: &SetupRequest) -> Result<ApiResponse> {
        let resp = self
            .client
            .post(self.url("/app-config"))
            .json(req)
            .send()
            .await?;
        Self::into_api_response(resp).await
    }

    pub async fn generate_keypair(&self) -> Result<KeyPairResponse> {
        let resp = self.client.post(self.url("/keys/generate")).send().await?;
        if !resp.status().is_success() {
            bail!("Key generation failed: {}", resp.text().await?);
        }
        Ok(resp.json().await?)
    }

    pub async fn public_key(&self) -> Result<(StatusCode, String)> {
        let resp = self.client.get(self.url("/public-key")).send().await?;
        Ok((resp.status(), resp.text().await?))
    }

    pub async fn signup(&self, username: &str, password: &str) -> Result<ApiResponse> {
        self.credentials("/signup", username, password).await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<ApiResponse> {
        self.credentials("/login", username, password).await
    }

    async fn credentials(&self, path: &str, username: &str, password: &str) -> Result<ApiResponse> {
        let resp = self
            .client
            .post(self.url(path))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await?;
        Self::into_api_response(resp).await
    }

    pub async fn me(&self, token: &str) -> Result<ApiResponse> {
        let resp = self
            .client
            .get(self.url("/me"))
            .bearer_auth(token)
            .send()
            .await?;
        Self::into_api_response(resp).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU16, Ordering};

    use authgate_auth::{TokenVerifier, TOKEN_TTL_SECS};
    use tempfile::TempDir;

    // Port counter to avoid conflicts between parallel tests
    static PORT_COUNTER: AtomicU16 = AtomicU16::new(18300);

    fn next_port() -> u16 {
        PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
    }

    async fn configure(client: &AuthgateClient) -> KeyPairResponse {
        let pair = client.generate_keypair().await.unwrap();
        let resp = client
            .setup(&SetupRequest {
                app_name: "Acme".into(),
                description: Some("Acme identity".into()),
                private_key: Some(pair.private_key.clone()),
                public_key: Some(pair.public_key.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(resp.status, StatusCode::OK, "setup failed: {:?}", resp.body);
        pair
    }

    #[tokio::test]
    async fn test_health_before_setup() {
        let data_dir = TempDir::new().unwrap();
        let server = TestServer::start(next_port(), data_dir.path(), None).await.unwrap();

        let health = server.client().health().await.unwrap();

        assert_eq!(health.status, "ok");
        assert!(!health.version.is_empty());
        assert!(!health.configured);
    }

    #[tokio::test]
    async fn test_signup_before_setup_unavailable() {
        let data_dir = TempDir::new().unwrap();
        let server = TestServer::start(next_port(), data_dir.path(), None).await.unwrap();
        let client = server.client();

        let resp = client.signup("bob001", "Secret99").await.unwrap();
        assert_eq!(resp.status, StatusCode::SERVICE_UNAVAILABLE);

        let resp = client.app_config().await.unwrap();
        assert_eq!(resp.status, StatusCode::NOT_FOUND);

        let (status, _) = client.public_key().await.unwrap();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_complete_lifecycle() {
        let data_dir = TempDir::new().unwrap();
        let server = TestServer::start(next_port(), data_dir.path(), None).await.unwrap();
        let client = server.client();

        // 1. Setup
        let pair = configure(&client).await;
        assert!(client.health().await.unwrap().configured);

        // 2. Setup again is refused and changes nothing
        let resp = client
            .setup(&SetupRequest {
                app_name: "Other".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(resp.status, StatusCode::FORBIDDEN);

        let config = client.app_config().await.unwrap();
        assert_eq!(config.body["appName"], "Acme");
        assert!(config.body.get("privateKey").is_none());

        // 3. Public key is served as PEM
        let (status, pem) = client.public_key().await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(pem, pair.public_key);

        // 4. Signup, duplicate signup
        let resp = client.signup("alice1", "Passw0rd1").await.unwrap();
        assert_eq!(resp.status, StatusCode::OK);

        let resp = client.signup("alice1", "Passw0rd2").await.unwrap();
        assert_eq!(resp.status, StatusCode::CONFLICT);

        // 5. Login, wrong password
        let resp = client.login("alice1", "Passw0rd1").await.unwrap();
        assert_eq!(resp.status, StatusCode::OK);
        let token = resp.body["token"].as_str().unwrap().to_string();

        let resp = client.login("alice1", "wrong000").await.unwrap();
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

        // 6. The token verifies offline with the public key
        let verifier = TokenVerifier::from_public_key_pem(&pem).unwrap();
        let claims = verifier.verify(&token).unwrap();
        assert_eq!(claims.username, "alice1");
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_SECS);

        // 7. And online through /me
        let resp = client.me(&token).await.unwrap();
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body["username"], "alice1");

        let resp = client.me("garbage").await.unwrap();
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_state_survives_restart() {
        let data_dir = TempDir::new().unwrap();

        {
            let server = TestServer::start(next_port(), data_dir.path(), None).await.unwrap();
            let client = server.client();
            configure(&client).await;
            let resp = client.signup("alice1", "Passw0rd1").await.unwrap();
            assert_eq!(resp.status, StatusCode::OK);
        }

        let server = TestServer::start(next_port(), data_dir.path(), None).await.unwrap();
        let client = server.client();

        assert!(client.health().await.unwrap().configured);

        let resp = client
            .setup(&SetupRequest {
                app_name: "Other".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(resp.status, StatusCode::FORBIDDEN);

        let resp = client.login("alice1", "Passw0rd1").await.unwrap();
        assert_eq!(resp.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_concurrent_setup_single_winner() {
        let data_dir = TempDir::new().unwrap();
        let server = TestServer::start(next_port(), data_dir.path(), None).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let client = server.client();
            handles.push(tokio::spawn(async move {
                client
                    .setup(&SetupRequest {
                        app_name: format!("App {i}"),
                        ..Default::default()
                    })
                    .await
                    .unwrap()
                    .status
            }));
        }

        let mut ok = 0;
        let mut forbidden = 0;
        for handle in handles {
            match handle.await.unwrap() {
                StatusCode::OK => ok += 1,
                StatusCode::FORBIDDEN => forbidden += 1,
                other => panic!("unexpected status: {other}"),
            }
        }

        assert_eq!(ok, 1);
        assert_eq!(forbidden, 7);
    }

    #[tokio::test]
    async fn test_keys_mirrored_to_disk() {
        let data_dir = TempDir::new().unwrap();
        let keys_dir = TempDir::new().unwrap();
        let server = TestServer::start(next_port(), data_dir.path(), Some(keys_dir.path()))
            .await
            .unwrap();

        let pair = configure(&server.client()).await;

        let private = std::fs::read_to_string(keys_dir.path().join("jwtRS256.key")).unwrap();
        let public = std::fs::read_to_string(keys_dir.path().join("jwtRS256.key.pub")).unwrap();
        assert_eq!(private, pair.private_key);
        assert_eq!(public, pair.public_key);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(keys_dir.path().join("jwtRS256.key"))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
