//! ClickHouse table schemas.
//!
//! - Ids are stored as UUID strings
//! - Timestamps are DateTime64(6, 'UTC'), written and read as raw
//!   microseconds since the epoch
//! - KPIs are versioned rows in a ReplacingMergeTree; updates and deletes
//!   insert a newer version

/// Touch events. Immutable once written.
pub const CREATE_TRACKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS tracks (
    id String,
    owner_id String,
    user_id Nullable(String),
    anonymous_id String,

    page_url Nullable(String),
    page_path Nullable(String),
    page_title Nullable(String),
    page_referrer Nullable(String),
    event Nullable(String),
    ip Nullable(String),

    campaign_source Nullable(String),
    campaign_medium Nullable(String),
    campaign_name Nullable(String),
    campaign_content Nullable(String),

    sent_at DateTime64(6, 'UTC'),
    received_at DateTime64(6, 'UTC'),

    -- Opaque JSON, empty when absent
    extra String
)
ENGINE = MergeTree()
PARTITION BY toYYYYMM(received_at)
ORDER BY (owner_id, anonymous_id, sent_at, received_at, id)
SETTINGS index_granularity = 8192
"#;

/// KPI definitions with their weight blob.
pub const CREATE_KPIS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS kpis (
    id String,
    owner_id String,
    match_column String,
    match_value String,
    name String,
    target Nullable(Int64),
    created_at DateTime64(6, 'UTC'),
    weight_data String,

    version UInt64,
    deleted UInt8
)
ENGINE = ReplacingMergeTree(version)
ORDER BY (owner_id, id)
"#;

/// Conversion join records.
pub const CREATE_CONVERSIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS conversions (
    id String,
    owner_id String,
    track_id String,
    kpi_id String,
    created_at DateTime64(6, 'UTC')
)
ENGINE = MergeTree()
PARTITION BY toYYYYMM(created_at)
ORDER BY (owner_id, kpi_id, created_at, id)
"#;

/// All table DDL in creation order.
pub fn all_tables() -> Vec<&'static str> {
    vec![
        CREATE_TRACKS_TABLE,
        CREATE_KPIS_TABLE,
        CREATE_CONVERSIONS_TABLE,
    ]
}

/// Tables truncated between integration tests.
pub const TABLE_NAMES: [&str; 3] = ["tracks", "kpis", "conversions"];
