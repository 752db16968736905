//! Authgate CLI - Command line interface.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use authgate_auth::TokenVerifier;
use authgate_config::KeyFiles;
use authgate_crypto::KeyPair;

// ============================================================================
// CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "authgate")]
#[command(about = "Authgate CLI - Set up the service, manage keys, sign up and log in")]
#[command(version)]
struct Cli {
    /// Authgate server address
    #[arg(long, default_value = "http://localhost:8300", env = "AUTHGATE_ADDR")]
    addr: String,

    /// Session token (used by `verify` when no token is given)
    #[arg(long, env = "AUTHGATE_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server status
    Status,
    /// Run one-time service setup
    Setup(SetupArgs),
    /// Keypair commands
    Keys {
        #[command(subcommand)]
        command: KeysCommands,
    },
    /// Print the token verification public key
    PublicKey,
    /// Create an account and print its token
    Signup {
        /// Username
        username: String,
        /// Password (or read from stdin if not provided)
        #[arg(long, env = "AUTHGATE_PASSWORD")]
        password: Option<String>,
    },
    /// Log in and print a token
    Login {
        /// Username
        username: String,
        /// Password (or read from stdin if not provided)
        #[arg(long, env = "AUTHGATE_PASSWORD")]
        password: Option<String>,
    },
    /// Verify a token locally against the server's public key
    Verify {
        /// Token (defaults to --token)
        token: Option<String>,
    },
}

#[derive(Args)]
struct SetupArgs {
    /// Display name (2-64 characters)
    #[arg(long)]
    app_name: String,
    /// Short description
    #[arg(long)]
    description: Option<String>,
    /// Absolute http(s) logo URL
    #[arg(long)]
    logo_url: Option<String>,
    /// Generate a fresh signing keypair on the server
    #[arg(long, conflicts_with_all = ["private_key_file", "public_key_file"])]
    generate_keys: bool,
    /// PKCS8 PEM private key file
    #[arg(long, requires = "public_key_file")]
    private_key_file: Option<PathBuf>,
    /// SPKI PEM public key file
    #[arg(long, requires = "private_key_file")]
    public_key_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum KeysCommands {
    /// Generate an RSA-2048 keypair (not stored by the server)
    Generate {
        /// Write jwtRS256.key and jwtRS256.key.pub into this directory
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
    version: String,
    configured: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicConfigResponse {
    app_name: String,
    description: Option<String>,
    logo_url: Option<String>,
    public_key: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SetupRequest {
    app_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    logo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    private_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    public_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyPairResponse {
    private_key: String,
    public_key: String,
}

#[derive(Serialize)]
struct CredentialsRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// HTTP Client
// ============================================================================

struct AuthgateClient {
    client: Client,
    base_url: String,
}

impl AuthgateClient {
    fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/api{}", self.base_url, path)
    }

    /// Fails with the server's error message on a non-2xx response.
    async fn check(resp: Response, what: &str) -> Result<Response> {
        if !resp.status().is_success() {
            let status = resp.status();
            let error: ErrorResponse = resp.json().await.unwrap_or(ErrorResponse {
                error: "Unknown error".into(),
            });
            bail!("{} failed ({}): {}", what, status, error.error);
        }
        Ok(resp)
    }

    async fn get_health(&self) -> Result<HealthResponse> {
        let resp = self
            .client
            .get(self.url("/health"))
            .send()
            .await
            .context("Failed to connect to server")?;

        let resp = Self::check(resp, "Health check").await?;
        resp.json().await.context("Failed to parse response")
    }

    async fn get_app_config(&self) -> Result<Option<PublicConfigResponse>> {
        let resp = self
            .client
            .get(self.url("/app-config"))
            .send()
            .await
            .context("Failed to connect to server")?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let resp = Self::check(resp, "Get config").await?;
        resp.json().await.context("Failed to parse response").map(Some)
    }

    async fn setup(&self, req: &SetupRequest) -> Result<()> {
        let resp = self
            .client
            .post(self.url("/app-config"))
            .json(req)
            .send()
            .await
            .context("Failed to connect to server")?;

        Self::check(resp, "Setup").await?;
        Ok(())
    }

    async fn generate_keypair(&self) -> Result<KeyPairResponse> {
        let resp = self
            .client
            .post(self.url("/keys/generate"))
            .send()
            .await
            .context("Failed to connect to server")?;

        let resp = Self::check(resp, "Key generation").await?;
        resp.json().await.context("Failed to parse response")
    }

    async fn public_key(&self) -> Result<String> {
        let resp = self
            .client
            .get(self.url("/public-key"))
            .send()
            .await
            .context("Failed to connect to server")?;

        let resp = Self::check(resp, "Get public key").await?;
        resp.text().await.context("Failed to read response")
    }

    async fn credentials(&self, path: &str, username: &str, password: &str) -> Result<String> {
        let req = CredentialsRequest { username, password };

        let resp = self
            .client
            .post(self.url(path))
            .json(&req)
            .send()
            .await
            .context("Failed to connect to server")?;

        let what = if path == "/signup" { "Signup" } else { "Login" };
        let resp = Self::check(resp, what).await?;
        let body: TokenResponse = resp.json().await.context("Failed to parse response")?;
        Ok(body.token)
    }
}

// ============================================================================
// Command Handlers
// ============================================================================

fn read_password(password: Option<String>) -> Result<String> {
    let password = match password {
        Some(p) => p,
        None => {
            print!("Password: ");
            io::stdout().flush()?;
            let stdin = io::stdin();
            let mut line = String::new();
            stdin.lock().read_line(&mut line)?;
            line.trim_end_matches(['\r', '\n']).to_string()
        },
    };

    if password.is_empty() {
        bail!("Password cannot be empty");
    }

    Ok(password)
}

async fn cmd_status(client: &AuthgateClient) -> Result<()> {
    let health = client.get_health().await?;

    println!("Authgate server status:");
    println!("  Status:     {}", health.status);
    println!("  Version:    {}", health.version);
    println!("  Configured: {}", health.configured);

    if let Some(config) = client.get_app_config().await? {
        println!("  App name:   {}", config.app_name);
        if let Some(description) = &config.description {
            println!("  About:      {}", description);
        }
        if let Some(logo_url) = &config.logo_url {
            println!("  Logo:       {}", logo_url);
        }
        println!(
            "  Signing:    {}",
            if config.public_key.is_some() {
                "RS256 key configured"
            } else {
                "no key (signup and login disabled)"
            }
        );
    }

    Ok(())
}

async fn cmd_setup(client: &AuthgateClient, args: SetupArgs) -> Result<()> {
    let (private_key, public_key) = if args.generate_keys {
        println!("Generating RSA-2048 keypair...");
        let pair = client.generate_keypair().await?;
        (Some(pair.private_key), Some(pair.public_key))
    } else {
        match (&args.private_key_file, &args.public_key_file) {
            (Some(private), Some(public)) => (
                Some(
                    std::fs::read_to_string(private)
                        .with_context(|| format!("Failed to read {}", private.display()))?,
                ),
                Some(
                    std::fs::read_to_string(public)
                        .with_context(|| format!("Failed to read {}", public.display()))?,
                ),
            ),
            _ => (None, None),
        }
    };

    let has_keys = private_key.is_some();
    let req = SetupRequest {
        app_name: args.app_name,
        description: args.description,
        logo_url: args.logo_url,
        private_key,
        public_key,
    };

    client.setup(&req).await?;

    println!("Authgate configured as '{}'.", req.app_name);
    if !has_keys {
        println!("Warning: no signing keypair was supplied. Signup and login stay disabled.");
    }

    Ok(())
}

async fn cmd_keys_generate(client: &AuthgateClient, out: Option<PathBuf>) -> Result<()> {
    let pair = client.generate_keypair().await?;

    match out {
        Some(dir) => {
            let files = KeyFiles::new(dir);
            files
                .write(&KeyPair::new(pair.private_key, pair.public_key))
                .context("Failed to write key files")?;
            println!("Private key: {}", files.private_key_path().display());
            println!("Public key:  {}", files.public_key_path().display());
        },
        None => {
            print!("{}", pair.private_key);
            print!("{}", pair.public_key);
        },
    }

    Ok(())
}

async fn cmd_public_key(client: &AuthgateClient) -> Result<()> {
    print!("{}", client.public_key().await?);
    Ok(())
}

async fn cmd_signup(client: &AuthgateClient, username: &str, password: Option<String>) -> Result<()> {
    let password = read_password(password)?;
    let token = client.credentials("/signup", username, &password).await?;
    println!("{}", token);
    Ok(())
}

async fn cmd_login(client: &AuthgateClient, username: &str, password: Option<String>) -> Result<()> {
    let password = read_password(password)?;
    let token = client.credentials("/login", username, &password).await?;
    println!("{}", token);
    Ok(())
}

async fn cmd_verify(client: &AuthgateClient, token: Option<String>) -> Result<()> {
    let token = token.context("Token required. Pass it as an argument, set AUTHGATE_TOKEN or use --token")?;

    let pem = client.public_key().await?;
    let verifier = TokenVerifier::from_public_key_pem(&pem).context("Server returned an unusable public key")?;
    let claims = verifier.verify(&token).context("Token rejected")?;

    println!("Token is valid.");
    println!("  Username:   {}", claims.username);
    println!("  Issued at:  {}", claims.iat);
    println!("  Expires at: {}", claims.exp);

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = AuthgateClient::new(&cli.addr)?;

    match cli.command {
        Commands::Status => cmd_status(&client).await,
        Commands::Setup(args) => cmd_setup(&client, args).await,
        Commands::Keys { command } => match command {
            KeysCommands::Generate { out } => cmd_keys_generate(&client, out).await,
        },
        Commands::PublicKey => cmd_public_key(&client).await,
        Commands::Signup { username, password } => cmd_signup(&client, &username, password).await,
        Commands::Login { username, password } => cmd_login(&client, &username, password).await,
        Commands::Verify { token } => cmd_verify(&client, token.or(cli.token)).await,
    }
}
