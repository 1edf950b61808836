//! ClickHouse client wrapper.

use ::clickhouse::Client;
use insights_core::{Error, Result};
use telemetry::metrics;
use tracing::{debug, error, info};

use super::config::ClickHouseConfig;
use super::schema::all_statements;

/// Maps a driver error to `StoreUnavailable`, counting it.
pub(crate) fn store_error(context: &str, err: ::clickhouse::error::Error) -> Error {
    metrics().store_errors.inc();
    error!(error = %err, "ClickHouse {} failed", context);
    Error::store_unavailable(format!("{}: {}", context, err))
}

/// ClickHouse client bound to the configured database.
#[derive(Clone)]
pub struct ClickHouseClient {
    inner: Client,
    config: ClickHouseConfig,
}

impl ClickHouseClient {
    pub fn new(config: ClickHouseConfig) -> Self {
        let inner = Self::base_client(&config).with_database(&config.database);

        info!(
            url = %config.url,
            database = %config.database,
            "Created ClickHouse client"
        );

        Self { inner, config }
    }

    fn base_client(config: &ClickHouseConfig) -> Client {
        let mut client = Client::default().with_url(&config.url);

        if let Some(ref user) = config.username {
            client = client.with_user(user);
        }

        if let Some(ref pass) = config.password {
            client = client.with_password(pass);
        }

        client
    }

    /// Returns the inner clickhouse client.
    pub fn inner(&self) -> &Client {
        &self.inner
    }

    pub fn config(&self) -> &ClickHouseConfig {
        &self.config
    }

    /// Check ClickHouse connection health.
    pub async fn check_connection(&self) -> Result<()> {
        self.inner
            .query("SELECT 1")
            .fetch_one::<u8>()
            .await
            .map_err(|e| store_error("health check", e))?;
        debug!("ClickHouse connection healthy");
        Ok(())
    }

    /// Creates the database and events table if missing.
    ///
    /// DDL runs on a client without a default database so the
    /// `CREATE DATABASE` statement works on a fresh server.
    pub async fn init_schema(&self) -> Result<()> {
        let server = Self::base_client(&self.config);

        for ddl in all_statements(&self.config.database) {
            server
                .query(&ddl)
                .execute()
                .await
                .map_err(|e| store_error("schema init", e))?;
        }

        info!(database = %self.config.database, "ClickHouse schema initialized");
        Ok(())
    }
}
