//! ClickHouse health checks and schema setup.

use crate::client::ClickHouseClient;
use crate::schema::all_tables;
use engine_core::error::DbErrorCode;
use engine_core::{Error, Result};
use tracing::{debug, error, info};

/// Check ClickHouse connection health.
pub async fn check_connection(client: &ClickHouseClient) -> bool {
    match client.inner().query("SELECT 1").fetch_one::<u8>().await {
        Ok(_) => {
            debug!("ClickHouse connection healthy");
            true
        }
        Err(e) => {
            error!("ClickHouse health check failed: {}", e);
            false
        }
    }
}

/// Creates the database and tables if missing.
pub async fn init_schema(client: &ClickHouseClient) -> Result<()> {
    let database = &client.config().database;

    client
        .server()
        .query(&format!("CREATE DATABASE IF NOT EXISTS `{}`", database))
        .execute()
        .await
        .map_err(|e| {
            Error::storage(
                DbErrorCode::WriteFailed,
                format!("Failed to create database {}: {}", database, e),
            )
        })?;

    for ddl in all_tables() {
        client.inner().query(ddl).execute().await.map_err(|e| {
            Error::storage(
                DbErrorCode::WriteFailed,
                format!("Failed to execute DDL: {}", e),
            )
        })?;
    }

    info!(database = %database, "ClickHouse schema initialized");
    Ok(())
}
