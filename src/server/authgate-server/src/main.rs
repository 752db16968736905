//! Authgate Server - Main entry point.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::http::HeaderValue;
use clap::Parser;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use authgate_api::AppState;
use authgate_auth::AuthService;
use authgate_config::{ConfigStore, KeyFiles};
use authgate_credentials::CredentialStore;
use authgate_storage_sqlite::SqliteBackend;

/// Database file name (without extension) inside the data directory.
const DB_NAME: &str = "authgate";

#[derive(Parser)]
#[command(name = "authgate-server")]
#[command(about = "Authgate - username/password authentication issuing RS256 tokens")]
#[command(version)]
struct Cli {
    /// Server bind address
    #[arg(long, default_value = "0.0.0.0:8300", env = "AUTHGATE_BIND_ADDRESS")]
    bind: String,

    /// Directory holding the SQLite database
    #[arg(long, default_value = "data", env = "AUTHGATE_DATA_DIR")]
    data_dir: PathBuf,

    /// Mirror the signing keys into this directory after setup
    #[arg(long, env = "AUTHGATE_KEYS_DIR")]
    keys_dir: Option<PathBuf>,

    /// Allowed browser origin (repeatable). Any origin when unset.
    #[arg(long = "cors-origin", env = "AUTHGATE_CORS_ORIGIN", value_delimiter = ',')]
    cors_origins: Vec<String>,
}

fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() {
        return Ok(layer.allow_origin(Any));
    }

    let origins = origins
        .iter()
        .map(|o| HeaderValue::from_str(o).with_context(|| format!("invalid CORS origin: {o}")))
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(layer.allow_origin(AllowOrigin::list(origins)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    tracing::info!("Starting Authgate server...");
    tracing::info!(bind = %cli.bind, data_dir = %cli.data_dir.display(), "Server configuration");

    let backend = SqliteBackend::open(&cli.data_dir, DB_NAME)
        .await
        .context("failed to open database")?;

    let mut config = ConfigStore::new(Arc::new(backend.clone()));
    if let Some(dir) = &cli.keys_dir {
        tracing::info!(keys_dir = %dir.display(), "Key file mirror enabled");
        config = config.with_key_files(KeyFiles::new(dir));
    }
    let config = Arc::new(config);

    let credentials = CredentialStore::new(backend)
        .await
        .context("failed to initialize credential store")?;
    let auth = Arc::new(AuthService::new(Arc::clone(&config), credentials));

    if !config.exists().await.context("failed to read config")? {
        tracing::warn!("Service is not configured yet - run setup before accepting signups");
    }

    let app = authgate_api::router(AppState::new(config, auth))
        .layer(cors_layer(&cli.cors_origins)?)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&cli.bind)
        .await
        .with_context(|| format!("failed to bind {}", cli.bind))?;

    tracing::info!(addr = %listener.local_addr()?, "Authgate server started successfully");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}
