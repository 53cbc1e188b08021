//! ClickHouse client wrapper.

use crate::config::ClickHouseConfig;
use clickhouse::Client;
use tracing::info;

/// ClickHouse client bound to the configured database.
#[derive(Clone)]
pub struct ClickHouseClient {
    inner: Client,
    server: Client,
    config: ClickHouseConfig,
}

impl ClickHouseClient {
    /// Creates a new ClickHouse client.
    pub fn new(config: ClickHouseConfig) -> Self {
        let mut server = Client::default()
            .with_url(&config.url)
            .with_option("max_execution_time", config.timeout_secs.to_string());

        if let Some(ref user) = config.username {
            server = server.with_user(user);
        }

        if let Some(ref pass) = config.password {
            server = server.with_password(pass);
        }

        let inner = server.clone().with_database(&config.database);

        info!(
            url = %config.url,
            database = %config.database,
            "Created ClickHouse client"
        );

        Self {
            inner,
            server,
            config,
        }
    }

    /// Client scoped to the configured database.
    pub fn inner(&self) -> &Client {
        &self.inner
    }

    /// Client without a default database, for DDL that creates it.
    pub fn server(&self) -> &Client {
        &self.server
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClickHouseConfig {
        &self.config
    }
}
