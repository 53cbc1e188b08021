//! In-memory store backend.
//!
//! Backs single-node runs and tests. Failure injection flags let tests
//! exercise the storage error paths.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engine_core::error::{DbErrorCode, NotFoundErrorCode};
use engine_core::{
    Conversion, ConversionStore, Error, EventStore, Kpi, KpiStore, MatchColumn, Result, Track,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::resolver::sort_touches;

/// Event, KPI and conversion store held in process memory.
#[derive(Default)]
pub struct MemoryStore {
    tracks: RwLock<Vec<Track>>,
    kpis: RwLock<HashMap<Uuid, Kpi>>,
    conversions: RwLock<Vec<Conversion>>,
    fail_on_write: RwLock<bool>,
    fail_on_read: RwLock<bool>,
    fail_on_weight_update: RwLock<bool>,
    read_delay: RwLock<Option<Duration>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_write(&self, fail: bool) {
        *self.fail_on_write.write().await = fail;
    }

    pub async fn set_fail_on_read(&self, fail: bool) {
        *self.fail_on_read.write().await = fail;
    }

    /// Fails only `KpiStore::update_weight_data`.
    pub async fn set_fail_on_weight_update(&self, fail: bool) {
        *self.fail_on_weight_update.write().await = fail;
    }

    /// Delays every visitor lookup, for deadline tests.
    pub async fn set_read_delay(&self, delay: Option<Duration>) {
        *self.read_delay.write().await = delay;
    }

    async fn check_write(&self) -> Result<()> {
        if *self.fail_on_write.read().await {
            return Err(Error::storage(
                DbErrorCode::WriteFailed,
                "memory store: write failure injected",
            ));
        }
        Ok(())
    }

    async fn check_read(&self) -> Result<()> {
        if *self.fail_on_read.read().await {
            return Err(Error::storage(
                DbErrorCode::ReadFailed,
                "memory store: read failure injected",
            ));
        }
        let delay = *self.read_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn visitors_where<F>(&self, owner_id: Uuid, pred: F) -> Result<Vec<String>>
    where
        F: Fn(&Track) -> bool + Send,
    {
        self.check_read().await?;
        let tracks = self.tracks.read().await;
        let visitors: HashSet<&str> = tracks
            .iter()
            .filter(|t| t.owner_id == owner_id && pred(t))
            .map(|t| t.anonymous_id.as_str())
            .collect();

        let mut visitors: Vec<String> = visitors.into_iter().map(String::from).collect();
        visitors.sort();
        Ok(visitors)
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn store(&self, track: &Track) -> Result<Uuid> {
        self.check_write().await?;
        self.tracks.write().await.push(track.clone());
        Ok(track.id)
    }

    async fn find_by_id(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Track>> {
        self.check_read().await?;
        let tracks = self.tracks.read().await;
        Ok(tracks
            .iter()
            .find(|t| t.id == id && t.owner_id == owner_id)
            .cloned())
    }

    async fn find_all_by_visitor_before(
        &self,
        owner_id: Uuid,
        anonymous_id: &str,
        before: DateTime<Utc>,
    ) -> Result<Vec<Track>> {
        self.check_read().await?;
        let mut touches: Vec<Track> = self
            .tracks
            .read()
            .await
            .iter()
            .filter(|t| {
                t.owner_id == owner_id && t.anonymous_id == anonymous_id && t.sent_at < before
            })
            .cloned()
            .collect();
        sort_touches(&mut touches);
        Ok(touches)
    }

    async fn find_all_by_visitor(&self, owner_id: Uuid, anonymous_id: &str) -> Result<Vec<Track>> {
        self.check_read().await?;
        let mut touches: Vec<Track> = self
            .tracks
            .read()
            .await
            .iter()
            .filter(|t| t.owner_id == owner_id && t.anonymous_id == anonymous_id)
            .cloned()
            .collect();
        sort_touches(&mut touches);
        Ok(touches)
    }

    async fn find_earliest_by_visitor(
        &self,
        owner_id: Uuid,
        anonymous_id: &str,
    ) -> Result<Option<Track>> {
        self.check_read().await?;
        let tracks = self.tracks.read().await;
        Ok(tracks
            .iter()
            .filter(|t| t.owner_id == owner_id && t.anonymous_id == anonymous_id)
            .min_by(|a, b| a.receipt_order(b))
            .cloned())
    }

    async fn find_visitors_matching(
        &self,
        owner_id: Uuid,
        column: MatchColumn,
        value: &str,
    ) -> Result<Vec<String>> {
        self.visitors_where(owner_id, |t| column.value_of(t) == Some(value))
            .await
    }

    async fn find_visitors_with_dimension(
        &self,
        owner_id: Uuid,
        column: MatchColumn,
    ) -> Result<Vec<String>> {
        self.visitors_where(owner_id, |t| column.is_present(t)).await
    }

    async fn ping(&self) -> Result<()> {
        self.check_read().await
    }
}

#[async_trait]
impl KpiStore for MemoryStore {
    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Kpi>> {
        self.check_read().await?;
        let mut kpis: Vec<Kpi> = self
            .kpis
            .read()
            .await
            .values()
            .filter(|k| k.owner_id == owner_id)
            .cloned()
            .collect();
        kpis.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(kpis)
    }

    async fn find_by_id(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Kpi>> {
        self.check_read().await?;
        Ok(self
            .kpis
            .read()
            .await
            .get(&id)
            .filter(|k| k.owner_id == owner_id)
            .cloned())
    }

    async fn store(&self, kpi: &Kpi) -> Result<Uuid> {
        self.check_write().await?;
        self.kpis.write().await.insert(kpi.id, kpi.clone());
        Ok(kpi.id)
    }

    async fn update_weight_data(&self, kpi: &Kpi) -> Result<()> {
        self.check_write().await?;
        if *self.fail_on_weight_update.read().await {
            return Err(Error::storage(
                DbErrorCode::WriteFailed,
                "memory store: weight update failure injected",
            ));
        }

        let mut kpis = self.kpis.write().await;
        match kpis.get_mut(&kpi.id).filter(|k| k.owner_id == kpi.owner_id) {
            Some(stored) => {
                stored.weight_data = kpi.weight_data.clone();
                Ok(())
            }
            None => Err(Error::not_found(
                NotFoundErrorCode::Kpi,
                format!("kpi {} not found", kpi.id),
            )),
        }
    }

    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<u64> {
        self.check_write().await?;
        let mut kpis = self.kpis.write().await;
        if kpis.get(&id).is_some_and(|k| k.owner_id == owner_id) {
            kpis.remove(&id);
            return Ok(1);
        }
        Ok(0)
    }
}

#[async_trait]
impl ConversionStore for MemoryStore {
    async fn store(&self, conversion: &Conversion) -> Result<Uuid> {
        self.check_write().await?;
        self.conversions.write().await.push(conversion.clone());
        Ok(conversion.id)
    }

    async fn exists(&self, owner_id: Uuid, track_id: Uuid, kpi_id: Uuid) -> Result<bool> {
        self.check_read().await?;
        Ok(self.conversions.read().await.iter().any(|c| {
            c.owner_id == owner_id && c.track_id == track_id && c.kpi_id == kpi_id
        }))
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Conversion>> {
        self.check_read().await?;
        let mut found: Vec<Conversion> = self
            .conversions
            .read()
            .await
            .iter()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(found)
    }

    async fn find_by_kpi(&self, owner_id: Uuid, kpi_id: Uuid) -> Result<Vec<Conversion>> {
        self.check_read().await?;
        Ok(self
            .conversions
            .read()
            .await
            .iter()
            .filter(|c| c.owner_id == owner_id && c.kpi_id == kpi_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<u64> {
        self.check_write().await?;
        let mut conversions = self.conversions.write().await;
        let before = conversions.len();
        conversions.retain(|c| !(c.id == id && c.owner_id == owner_id));
        Ok((before - conversions.len()) as u64)
    }
}
