//! Customer Insights Engine
//!
//! Behavioral event store and analytical query service:
//! - Event validation, enrichment and persistence (memory or ClickHouse)
//! - Customer, business, funnel, cohort and predictive analytics over HTTP
//! - Background retention purge and store health probing

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::signal;
use tracing::{error, info, warn};

use api::{router, AppState};
use event_store::{ClickHouseConfig, ClickHouseStore, EventStore, MemoryStore};
use insights_analytics::EngineConfig;
use insights_core::{retention::DEFAULT_PURGE_BATCH_SIZE, RetentionPolicy};
use telemetry::init_tracing_from_env;
use worker::{probe_store, RetentionManager, WorkerConfig, WorkerScheduler};

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
enum Backend {
    #[default]
    Memory,
    Clickhouse,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreSettings {
    #[serde(default)]
    backend: Backend,
    #[serde(default)]
    clickhouse: ClickHouseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RetentionSettings {
    /// Seconds between scheduled purges
    #[serde(default = "default_retention_interval")]
    interval_secs: u64,
    #[serde(default = "default_batch_size")]
    batch_size: usize,
    /// Retention assigned to events ingested without an explicit expiry
    #[serde(default = "default_retention_days")]
    retention_days: u32,
}

fn default_retention_interval() -> u64 {
    3600
}

fn default_batch_size() -> usize {
    DEFAULT_PURGE_BATCH_SIZE
}

fn default_retention_days() -> u32 {
    365
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_retention_interval(),
            batch_size: default_batch_size(),
            retention_days: default_retention_days(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    /// Deadline applied to queries that do not carry their own
    #[serde(default = "default_query_timeout_ms")]
    query_timeout_ms: u64,

    #[serde(default)]
    store: StoreSettings,

    #[serde(default)]
    retention: RetentionSettings,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_query_timeout_ms() -> u64 {
    10_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            query_timeout_ms: default_query_timeout_ms(),
            store: StoreSettings::default(),
            retention: RetentionSettings::default(),
        }
    }
}

impl Config {
    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            query_timeout: Duration::from_millis(self.query_timeout_ms.max(1)),
            retention: RetentionPolicy::new(self.retention.retention_days, self.retention.batch_size),
        }
    }

    fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            retention_interval: Duration::from_secs(self.retention.interval_secs.max(1)),
            ..WorkerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Customer Insights Engine v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    info!(
        backend = ?config.store.backend,
        query_timeout_ms = config.query_timeout_ms,
        retention_days = config.retention.retention_days,
        "Loaded configuration"
    );

    let store = open_store(&config).await?;

    // Startup probe so readiness reflects the store before the first tick
    match probe_store(store.as_ref()).await {
        Ok(count) => info!(records = count, "Event store reachable"),
        Err(e) => error!("Event store unreachable at startup: {}", e),
    }

    let engine_config = config.engine_config();
    let retention = Arc::new(RetentionManager::new(store.clone(), engine_config.retention));

    let scheduler = Arc::new(WorkerScheduler::new(
        config.worker_config(),
        store.clone(),
        retention.clone(),
    ));
    let worker_handles = scheduler.start();

    let state = AppState::with_retention(store.clone(), engine_config, retention);
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

    info!("Shutting down...");

    for handle in worker_handles {
        handle.abort();
    }

    if let Err(e) = store.close().await {
        error!("Failed to close event store: {}", e);
    }

    info!("Shutdown complete");
    Ok(())
}

async fn open_store(config: &Config) -> Result<Arc<dyn EventStore>> {
    match config.store.backend {
        Backend::Memory => {
            warn!("Using in-memory event store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        Backend::Clickhouse => {
            let ch = &config.store.clickhouse;
            info!(url = %ch.url, database = %ch.database, "Connecting to ClickHouse");
            let store = ClickHouseStore::connect(ch.clone())
                .await
                .context("Failed to initialize ClickHouse event store")?;
            Ok(Arc::new(store))
        }
    }
}

/// Load configuration from defaults, `config/default.toml` and `INSIGHTS__*`.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        .add_source(config::Config::try_from(&Config::default())?)
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // INSIGHTS__STORE__CLICKHOUSE__URL -> store.clickhouse.url
        .add_source(
            config::Environment::with_prefix("INSIGHTS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
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
            Ok(mut stream) => {
                stream.recv().await;
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
