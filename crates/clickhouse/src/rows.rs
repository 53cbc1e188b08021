//! Row types and conversions between domain types and ClickHouse rows.

use chrono::{DateTime, Utc};
use clickhouse::Row;
use engine_core::error::DbErrorCode;
use engine_core::{Conversion, Error, Kpi, Result, Track, WeightData};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub(crate) fn to_micros(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_micros()
}

fn from_micros(micros: i64, field: &str) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros).ok_or_else(|| {
        Error::storage(
            DbErrorCode::ReadFailed,
            format!("{} out of range: {}", field, micros),
        )
    })
}

fn parse_id(raw: &str, field: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| {
        Error::storage(
            DbErrorCode::ReadFailed,
            format!("invalid {} '{}': {}", field, raw, e),
        )
    })
}

/// Columns selected for [`TrackRow`], in field order.
pub const TRACK_COLUMNS: &str = "id, owner_id, user_id, anonymous_id, page_url, page_path, \
     page_title, page_referrer, event, ip, campaign_source, campaign_medium, campaign_name, \
     campaign_content, sent_at, received_at, extra";

#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct TrackRow {
    pub id: String,
    pub owner_id: String,
    pub user_id: Option<String>,
    pub anonymous_id: String,
    pub page_url: Option<String>,
    pub page_path: Option<String>,
    pub page_title: Option<String>,
    pub page_referrer: Option<String>,
    pub event: Option<String>,
    pub ip: Option<String>,
    pub campaign_source: Option<String>,
    pub campaign_medium: Option<String>,
    pub campaign_name: Option<String>,
    pub campaign_content: Option<String>,
    pub sent_at: i64,     // DateTime64(6) as microseconds
    pub received_at: i64, // DateTime64(6) as microseconds
    pub extra: String,
}

impl From<&Track> for TrackRow {
    fn from(track: &Track) -> Self {
        Self {
            id: track.id.to_string(),
            owner_id: track.owner_id.to_string(),
            user_id: track.user_id.clone(),
            anonymous_id: track.anonymous_id.clone(),
            page_url: track.page_url.clone(),
            page_path: track.page_path.clone(),
            page_title: track.page_title.clone(),
            page_referrer: track.page_referrer.clone(),
            event: track.event.clone(),
            ip: track.ip.clone(),
            campaign_source: track.campaign_source.clone(),
            campaign_medium: track.campaign_medium.clone(),
            campaign_name: track.campaign_name.clone(),
            campaign_content: track.campaign_content.clone(),
            sent_at: to_micros(track.sent_at),
            received_at: to_micros(track.received_at),
            extra: track
                .extra
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_default(),
        }
    }
}

impl TryFrom<TrackRow> for Track {
    type Error = Error;

    fn try_from(row: TrackRow) -> Result<Self> {
        let extra = if row.extra.is_empty() {
            None
        } else {
            Some(serde_json::from_str(&row.extra)?)
        };

        Ok(Track {
            id: parse_id(&row.id, "track id")?,
            owner_id: parse_id(&row.owner_id, "owner id")?,
            user_id: row.user_id,
            anonymous_id: row.anonymous_id,
            page_url: row.page_url,
            page_path: row.page_path,
            page_title: row.page_title,
            page_referrer: row.page_referrer,
            event: row.event,
            ip: row.ip,
            campaign_source: row.campaign_source,
            campaign_medium: row.campaign_medium,
            campaign_name: row.campaign_name,
            campaign_content: row.campaign_content,
            sent_at: from_micros(row.sent_at, "sent_at")?,
            received_at: from_micros(row.received_at, "received_at")?,
            extra,
        })
    }
}

/// Columns selected for [`KpiRow`], in field order.
pub const KPI_COLUMNS: &str =
    "id, owner_id, match_column, match_value, name, target, created_at, weight_data, version, deleted";

#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct KpiRow {
    pub id: String,
    pub owner_id: String,
    pub match_column: String,
    pub match_value: String,
    pub name: String,
    pub target: Option<i64>,
    pub created_at: i64,
    /// JSON weight blob
    pub weight_data: String,
    pub version: u64,
    pub deleted: u8,
}

impl KpiRow {
    /// A new row version for `kpi`.
    pub fn version_of(kpi: &Kpi, deleted: bool) -> Result<Self> {
        Ok(Self {
            id: kpi.id.to_string(),
            owner_id: kpi.owner_id.to_string(),
            match_column: kpi.match_column.clone(),
            match_value: kpi.match_value.clone(),
            name: kpi.name.clone(),
            target: kpi.target,
            created_at: to_micros(kpi.created_at),
            weight_data: kpi.weight_data.to_blob()?,
            version: next_version(),
            deleted: u8::from(deleted),
        })
    }
}

impl TryFrom<KpiRow> for Kpi {
    type Error = Error;

    fn try_from(row: KpiRow) -> Result<Self> {
        Ok(Kpi {
            id: parse_id(&row.id, "kpi id")?,
            owner_id: parse_id(&row.owner_id, "owner id")?,
            match_column: row.match_column,
            match_value: row.match_value,
            name: row.name,
            target: row.target,
            created_at: from_micros(row.created_at, "created_at")?,
            weight_data: WeightData::from_blob(&row.weight_data)?,
        })
    }
}

/// Monotonic row version: wall-clock microseconds, bumped past the last
/// value handed out so two writes in the same microsecond still order.
fn next_version() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};

    static LAST: AtomicU64 = AtomicU64::new(0);

    let now = Utc::now().timestamp_micros().max(0) as u64;
    let mut last = LAST.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(seen) => last = seen,
        }
    }
}

pub const CONVERSION_COLUMNS: &str = "id, owner_id, track_id, kpi_id, created_at";

#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct ConversionRow {
    pub id: String,
    pub owner_id: String,
    pub track_id: String,
    pub kpi_id: String,
    pub created_at: i64,
}

impl From<&Conversion> for ConversionRow {
    fn from(c: &Conversion) -> Self {
        Self {
            id: c.id.to_string(),
            owner_id: c.owner_id.to_string(),
            track_id: c.track_id.to_string(),
            kpi_id: c.kpi_id.to_string(),
            created_at: to_micros(c.created_at),
        }
    }
}

impl TryFrom<ConversionRow> for Conversion {
    type Error = Error;

    fn try_from(row: ConversionRow) -> Result<Self> {
        Ok(Conversion {
            id: parse_id(&row.id, "conversion id")?,
            owner_id: parse_id(&row.owner_id, "owner id")?,
            track_id: parse_id(&row.track_id, "track id")?,
            kpi_id: parse_id(&row.kpi_id, "kpi id")?,
            created_at: from_micros(row.created_at, "created_at")?,
        })
    }
}
