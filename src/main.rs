//! Attribution Engine
//!
//! Pixel tracking service that:
//! - Records touches sent by the tracking pixel
//! - Matches each touch against the owner's KPIs and records conversions
//! - Accumulates first-touch attribution weights per KPI
//! - Serves journey, first-touch and daily conversion reports

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::signal;
use tracing::{error, info, warn};

use api::{router, AppState};
use attribution::{AttributionEngine, EngineConfig, MemoryStore};
use clickhouse_client::{ClickHouseClient, ClickHouseConfig, ClickHouseStore};
use telemetry::{health, init_tracing_from_env};

/// Which store backs the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StorageBackend {
    Memory,
    Clickhouse,
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    #[serde(default = "default_storage")]
    storage: StorageBackend,

    #[serde(default)]
    clickhouse: ClickHouseConfig,

    #[serde(default)]
    engine: EngineConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_storage() -> StorageBackend {
    StorageBackend::Memory
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            storage: default_storage(),
            clickhouse: ClickHouseConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Attribution Engine v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;

    info!(
        storage = ?config.storage,
        dedupe_conversions = config.engine.dedupe_conversions,
        query_timeout_secs = config.engine.query_timeout_secs,
        "Loaded configuration"
    );

    let engine = match config.storage {
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on restart");
            health().storage.set_healthy();
            AttributionEngine::with_store(Arc::new(MemoryStore::new()), config.engine.clone())
        }
        StorageBackend::Clickhouse => {
            let client = ClickHouseClient::new(config.clickhouse.clone());

            if let Err(e) = clickhouse_client::init_schema(&client).await {
                error!("Failed to initialize ClickHouse schema: {}", e);
                // Continue anyway - schema might already exist
            }

            if clickhouse_client::check_connection(&client).await {
                health().storage.set_healthy();
                info!("ClickHouse connection: healthy");
            } else {
                health().storage.set_unhealthy("Connection failed");
                error!("ClickHouse connection: unhealthy");
            }

            AttributionEngine::with_store(
                Arc::new(ClickHouseStore::new(client)),
                config.engine.clone(),
            )
        }
    };

    let state = AppState::new(Arc::new(engine));
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        .add_source(config::Config::try_from(&Config::default())?)
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("ATTRIBUTION")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // The config crate splits on single underscores inside nested keys, so
    // the nested ClickHouse fields are also read directly.
    if let Ok(url) = std::env::var("ATTRIBUTION_CLICKHOUSE_URL") {
        config.clickhouse.url = url;
    }
    if let Ok(database) = std::env::var("ATTRIBUTION_CLICKHOUSE_DATABASE") {
        config.clickhouse.database = database;
    }
    if let Ok(username) = std::env::var("ATTRIBUTION_CLICKHOUSE_USERNAME") {
        config.clickhouse.username = Some(username);
    }
    if let Ok(password) = std::env::var("ATTRIBUTION_CLICKHOUSE_PASSWORD") {
        config.clickhouse.password = Some(password);
    }
    if let Ok(dedupe) = std::env::var("ATTRIBUTION_DEDUPE_CONVERSIONS") {
        config.engine.dedupe_conversions = matches!(dedupe.trim(), "1" | "true" | "TRUE");
    }

    Ok(config)
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
