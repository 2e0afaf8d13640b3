//! Social Backend Binary
//!
//! Main entry point for the social backend service.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
#[cfg(feature = "mocks")]
use social_backend_lib::data::InMemoryRepository;
use social_backend_lib::{
    api::create_app,
    config::{Config, LogFormat},
    constants::database::{DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_MAX_CONNECTIONS},
    data::{postgres::PoolSettings, PostgresRepository, SocialRepository},
    log::initialize_logging,
    pagination::CursorPolicy,
    services::Services,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "social-backend")]
#[command(about = "Social Backend Service", long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Override server host
    #[arg(long)]
    host: Option<String>,

    /// Override server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override database URL
    #[arg(long)]
    database_url: Option<String>,

    /// Log output format (json, text or auto)
    #[arg(long, env = "LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// What to do with undecodable cursors (strict or lenient)
    #[arg(long)]
    cursor_policy: Option<CursorPolicy>,

    /// Secret used to sign pagination cursors
    #[arg(long, env = "CURSOR_SECRET", hide_env_values = true)]
    cursor_secret: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config_path = args.config.clone();
    let config = load_config(args)?;

    initialize_logging(config.log_format);

    info!("Starting Social Backend");
    match config_path {
        Some(path) => info!(%path, "Loaded config file"),
        None => debug!("No config file specified, using defaults"),
    }

    config
        .pagination
        .validate()
        .context("Invalid pagination configuration")?;
    info!("Server will run on {}:{}", config.host, config.port);

    let repository = create_repository(&config).await?;

    let shutdown = CancellationToken::new();
    let services = Services::new(repository, config.pagination.clone(), shutdown.clone());

    // Start server
    let app = create_app(services);
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .context("Failed to bind TCP listener")?;

    info!("Server listening on http://{}:{}", config.host, config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// Reads the config file, if any, and applies CLI overrides
///
/// Runs before the subscriber is installed, so it must not log.
fn load_config(args: Args) -> Result<Config> {
    let mut config = match args.config {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("Failed to read config file: {}", path))?,
        None => Config::default(),
    };

    // Apply CLI overrides
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(database_url) = args.database_url {
        config.database.url = database_url;
        #[cfg(feature = "mocks")]
        {
            config.database.mock_mode = false;
        }
    }
    if let Some(log_format) = args.log_format {
        config.log_format = log_format;
    }
    if let Some(cursor_policy) = args.cursor_policy {
        config.pagination.cursor_policy = cursor_policy;
    }
    if let Some(cursor_secret) = args.cursor_secret {
        config.pagination.cursor_secret = Some(cursor_secret);
    }

    Ok(config)
}

async fn create_repository(config: &Config) -> Result<Arc<dyn SocialRepository>> {
    #[cfg(feature = "mocks")]
    {
        if config.database.mock_mode {
            info!("Using in-memory repository with demo data (mock_mode enabled)");
            return Ok(Arc::new(InMemoryRepository::seeded()));
        }
    }

    let settings = PoolSettings {
        max_connections: config
            .database
            .max_connections
            .unwrap_or(DEFAULT_MAX_CONNECTIONS),
        connection_timeout: Duration::from_secs(
            config
                .database
                .connection_timeout_secs
                .unwrap_or(DEFAULT_CONNECTION_TIMEOUT_SECS),
        ),
    };

    let repository = PostgresRepository::new(&config.database.url, settings)
        .await
        .context("Failed to create repository with database connection")?;

    // Test the connection
    repository
        .test_connection()
        .await
        .context("Failed to connect to PostgreSQL")?;

    info!("Connected to PostgreSQL database");
    Ok(Arc::new(repository))
}

/// Resolves on Ctrl+C, cancelling in-flight pagination first
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }

    info!("Shutdown requested");
    shutdown.cancel();
}
