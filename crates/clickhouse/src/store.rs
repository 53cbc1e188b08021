//! ClickHouse-backed event, KPI and conversion stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engine_core::error::{DbErrorCode, NotFoundErrorCode};
use engine_core::{
    Conversion, ConversionStore, Error, EventStore, Kpi, KpiStore, MatchColumn, Result, Track,
};
use tracing::debug;
use uuid::Uuid;

use crate::client::ClickHouseClient;
use crate::rows::{
    to_micros, ConversionRow, KpiRow, TrackRow, CONVERSION_COLUMNS, KPI_COLUMNS, TRACK_COLUMNS,
};

fn read_err(what: &str, e: clickhouse::error::Error) -> Error {
    Error::storage(DbErrorCode::ReadFailed, format!("{}: {}", what, e))
}

fn write_err(what: &str, e: clickhouse::error::Error) -> Error {
    Error::storage(DbErrorCode::WriteFailed, format!("{}: {}", what, e))
}

/// All three stores over one ClickHouse database.
#[derive(Clone)]
pub struct ClickHouseStore {
    client: ClickHouseClient,
}

impl ClickHouseStore {
    pub fn new(client: ClickHouseClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ClickHouseClient {
        &self.client
    }

    async fn insert_row<T>(&self, table: &str, row: &T) -> Result<()>
    where
        T: clickhouse::Row + serde::Serialize + Send + Sync,
    {
        let mut insert = self
            .client
            .inner()
            .insert(table)
            .map_err(|e| write_err("Insert error", e))?;
        insert
            .write(row)
            .await
            .map_err(|e| write_err("Write error", e))?;
        insert.end().await.map_err(|e| write_err("End error", e))?;
        Ok(())
    }

    async fn fetch_tracks(&self, sql: &str, binds: TrackBinds<'_>) -> Result<Vec<Track>> {
        let mut query = self
            .client
            .inner()
            .query(sql)
            .bind(binds.owner_id.to_string())
            .bind(binds.anonymous_id);
        if let Some(before) = binds.before {
            query = query.bind(to_micros(before));
        }

        let rows: Vec<TrackRow> = query
            .fetch_all()
            .await
            .map_err(|e| read_err("Query error", e))?;
        rows.into_iter().map(Track::try_from).collect()
    }

    async fn distinct_visitors(
        &self,
        sql: &str,
        owner_id: Uuid,
        value: Option<&str>,
    ) -> Result<Vec<String>> {
        let mut query = self.client.inner().query(sql).bind(owner_id.to_string());
        if let Some(value) = value {
            query = query.bind(value);
        }
        query
            .fetch_all::<String>()
            .await
            .map_err(|e| read_err("Query error", e))
    }

    /// Latest live version of a KPI.
    async fn fetch_kpis(&self, owner_id: Uuid, id: Option<Uuid>) -> Result<Vec<Kpi>> {
        let id_filter = if id.is_some() { " AND id = ?" } else { "" };
        let sql = format!(
            "SELECT {cols} FROM (SELECT {cols} FROM kpis FINAL WHERE owner_id = ?{id_filter}) \
             WHERE deleted = 0 ORDER BY created_at, id",
            cols = KPI_COLUMNS,
            id_filter = id_filter,
        );

        let mut query = self.client.inner().query(&sql).bind(owner_id.to_string());
        if let Some(id) = id {
            query = query.bind(id.to_string());
        }

        let rows: Vec<KpiRow> = query
            .fetch_all()
            .await
            .map_err(|e| read_err("Query error", e))?;
        rows.into_iter().map(Kpi::try_from).collect()
    }

    async fn fetch_conversions(
        &self,
        sql: &str,
        owner_id: Uuid,
        extra: &[Uuid],
    ) -> Result<Vec<Conversion>> {
        let mut query = self.client.inner().query(sql).bind(owner_id.to_string());
        for id in extra {
            query = query.bind(id.to_string());
        }
        let rows: Vec<ConversionRow> = query
            .fetch_all()
            .await
            .map_err(|e| read_err("Query error", e))?;
        rows.into_iter().map(Conversion::try_from).collect()
    }
}

struct TrackBinds<'a> {
    owner_id: Uuid,
    anonymous_id: &'a str,
    before: Option<DateTime<Utc>>,
}

#[async_trait]
impl EventStore for ClickHouseStore {
    async fn store(&self, track: &Track) -> Result<Uuid> {
        self.insert_row("tracks", &TrackRow::from(track)).await?;
        debug!(track_id = %track.id, "Inserted track");
        Ok(track.id)
    }

    async fn find_by_id(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Track>> {
        let sql = format!(
            "SELECT {} FROM tracks WHERE owner_id = ? AND id = ? LIMIT 1",
            TRACK_COLUMNS
        );
        let rows: Vec<TrackRow> = self
            .client
            .inner()
            .query(&sql)
            .bind(owner_id.to_string())
            .bind(id.to_string())
            .fetch_all()
            .await
            .map_err(|e| read_err("Query error", e))?;
        rows.into_iter().next().map(Track::try_from).transpose()
    }

    async fn find_all_by_visitor_before(
        &self,
        owner_id: Uuid,
        anonymous_id: &str,
        before: DateTime<Utc>,
    ) -> Result<Vec<Track>> {
        let sql = format!(
            "SELECT {} FROM tracks WHERE owner_id = ? AND anonymous_id = ? \
             AND sent_at < fromUnixTimestamp64Micro(toInt64(?), 'UTC') \
             ORDER BY sent_at, received_at, id",
            TRACK_COLUMNS
        );
        self.fetch_tracks(
            &sql,
            TrackBinds {
                owner_id,
                anonymous_id,
                before: Some(before),
            },
        )
        .await
    }

    async fn find_all_by_visitor(&self, owner_id: Uuid, anonymous_id: &str) -> Result<Vec<Track>> {
        let sql = format!(
            "SELECT {} FROM tracks WHERE owner_id = ? AND anonymous_id = ? \
             ORDER BY sent_at, received_at, id",
            TRACK_COLUMNS
        );
        self.fetch_tracks(
            &sql,
            TrackBinds {
                owner_id,
                anonymous_id,
                before: None,
            },
        )
        .await
    }

    async fn find_earliest_by_visitor(
        &self,
        owner_id: Uuid,
        anonymous_id: &str,
    ) -> Result<Option<Track>> {
        let sql = format!(
            "SELECT {} FROM tracks WHERE owner_id = ? AND anonymous_id = ? \
             ORDER BY received_at, id LIMIT 1",
            TRACK_COLUMNS
        );
        let tracks = self
            .fetch_tracks(
                &sql,
                TrackBinds {
                    owner_id,
                    anonymous_id,
                    before: None,
                },
            )
            .await?;
        Ok(tracks.into_iter().next())
    }

    async fn find_visitors_matching(
        &self,
        owner_id: Uuid,
        column: MatchColumn,
        value: &str,
    ) -> Result<Vec<String>> {
        // Column names come from a closed enum, never from input.
        let sql = format!(
            "SELECT DISTINCT anonymous_id FROM tracks WHERE owner_id = ? AND {} = ? \
             ORDER BY anonymous_id",
            column.as_str()
        );
        self.distinct_visitors(&sql, owner_id, Some(value)).await
    }

    async fn find_visitors_with_dimension(
        &self,
        owner_id: Uuid,
        column: MatchColumn,
    ) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT DISTINCT anonymous_id FROM tracks WHERE owner_id = ? \
             AND {col} IS NOT NULL AND {col} != '' ORDER BY anonymous_id",
            col = column.as_str()
        );
        self.distinct_visitors(&sql, owner_id, None).await
    }

    async fn ping(&self) -> Result<()> {
        self.client
            .inner()
            .query("SELECT 1")
            .fetch_one::<u8>()
            .await
            .map(|_| ())
            .map_err(|e| read_err("Ping failed", e))
    }
}

#[async_trait]
impl KpiStore for ClickHouseStore {
    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Kpi>> {
        self.fetch_kpis(owner_id, None).await
    }

    async fn find_by_id(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Kpi>> {
        Ok(self.fetch_kpis(owner_id, Some(id)).await?.into_iter().next())
    }

    async fn store(&self, kpi: &Kpi) -> Result<Uuid> {
        self.insert_row("kpis", &KpiRow::version_of(kpi, false)?).await?;
        Ok(kpi.id)
    }

    async fn update_weight_data(&self, kpi: &Kpi) -> Result<()> {
        let Some(mut current) = KpiStore::find_by_id(self, kpi.owner_id, kpi.id).await? else {
            return Err(Error::not_found(
                NotFoundErrorCode::Kpi,
                format!("kpi {} not found", kpi.id),
            ));
        };

        current.weight_data = kpi.weight_data.clone();
        self.insert_row("kpis", &KpiRow::version_of(&current, false)?)
            .await
    }

    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<u64> {
        let Some(current) = KpiStore::find_by_id(self, owner_id, id).await? else {
            return Ok(0);
        };

        self.insert_row("kpis", &KpiRow::version_of(&current, true)?)
            .await?;
        Ok(1)
    }
}

#[async_trait]
impl ConversionStore for ClickHouseStore {
    async fn store(&self, conversion: &Conversion) -> Result<Uuid> {
        self.insert_row("conversions", &ConversionRow::from(conversion))
            .await?;
        Ok(conversion.id)
    }

    async fn exists(&self, owner_id: Uuid, track_id: Uuid, kpi_id: Uuid) -> Result<bool> {
        let count: u64 = self
            .client
            .inner()
            .query(
                "SELECT count() FROM conversions WHERE owner_id = ? AND kpi_id = ? AND track_id = ?",
            )
            .bind(owner_id.to_string())
            .bind(kpi_id.to_string())
            .bind(track_id.to_string())
            .fetch_one()
            .await
            .map_err(|e| read_err("Query error", e))?;
        Ok(count > 0)
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Conversion>> {
        let sql = format!(
            "SELECT {} FROM conversions WHERE owner_id = ? ORDER BY created_at DESC, id DESC",
            CONVERSION_COLUMNS
        );
        self.fetch_conversions(&sql, owner_id, &[]).await
    }

    async fn find_by_kpi(&self, owner_id: Uuid, kpi_id: Uuid) -> Result<Vec<Conversion>> {
        let sql = format!(
            "SELECT {} FROM conversions WHERE owner_id = ? AND kpi_id = ? ORDER BY created_at, id",
            CONVERSION_COLUMNS
        );
        self.fetch_conversions(&sql, owner_id, &[kpi_id]).await
    }

    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<u64> {
        let count: u64 = self
            .client
            .inner()
            .query("SELECT count() FROM conversions WHERE owner_id = ? AND id = ?")
            .bind(owner_id.to_string())
            .bind(id.to_string())
            .fetch_one()
            .await
            .map_err(|e| read_err("Query error", e))?;

        if count == 0 {
            return Ok(0);
        }

        self.client
            .inner()
            .query("DELETE FROM conversions WHERE owner_id = ? AND id = ?")
            .bind(owner_id.to_string())
            .bind(id.to_string())
            .execute()
            .await
            .map_err(|e| write_err("Delete error", e))?;
        Ok(count)
    }
}
