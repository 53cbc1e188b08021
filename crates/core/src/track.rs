//! Track (touch event) definitions.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::limits::MAX_EXTRA_BYTES;

/// Validates the opaque extra blob size.
fn validate_extra_size(extra: &serde_json::Value) -> Result<(), ValidationError> {
    if extra.is_null() {
        return Ok(());
    }

    let size = serde_json::to_vec(extra).map(|v| v.len()).unwrap_or(0);

    if size > MAX_EXTRA_BYTES {
        let mut err = ValidationError::new("extra_too_large");
        err.message = Some(
            format!(
                "extra {}KB exceeds {}KB limit",
                size / 1024,
                MAX_EXTRA_BYTES / 1024
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}

/// Track payload as sent by the pixel client.
///
/// Field names follow the pixel's camelCase JSON.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewTrack {
    /// Identified user, if the site knows who this is
    #[validate(length(max = 128))]
    pub user_id: Option<String>,
    /// Stable per-browser id used to stitch touches together
    #[validate(length(min = 1, max = 128))]
    pub anonymous_id: String,
    #[serde(rename = "pageURL")]
    #[validate(length(max = 2048))]
    pub page_url: Option<String>,
    #[validate(length(max = 2048))]
    pub page_path: Option<String>,
    #[validate(length(max = 500))]
    pub page_title: Option<String>,
    #[validate(length(max = 2048))]
    pub page_referrer: Option<String>,
    /// Named interaction (e.g. "signup")
    #[validate(length(max = 100))]
    pub event: Option<String>,
    #[validate(length(max = 256))]
    pub campaign_source: Option<String>,
    #[validate(length(max = 256))]
    pub campaign_medium: Option<String>,
    #[validate(length(max = 256))]
    pub campaign_name: Option<String>,
    #[validate(length(max = 256))]
    pub campaign_content: Option<String>,
    /// Client-reported send time
    #[serde(default = "Utc::now")]
    pub sent_at: DateTime<Utc>,
    /// Opaque extra data (max 16KB)
    #[validate(custom(function = "validate_extra_size"))]
    pub extra: Option<serde_json::Value>,
}

/// An empty payload sent now, matching what deserialization fills in.
impl Default for NewTrack {
    fn default() -> Self {
        Self {
            user_id: None,
            anonymous_id: String::new(),
            page_url: None,
            page_path: None,
            page_title: None,
            page_referrer: None,
            event: None,
            campaign_source: None,
            campaign_medium: None,
            campaign_name: None,
            campaign_content: None,
            sent_at: Utc::now(),
            extra: None,
        }
    }
}

/// A recorded touch. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub user_id: Option<String>,
    pub anonymous_id: String,
    #[serde(rename = "pageURL")]
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
    pub sent_at: DateTime<Utc>,
    /// Server receive timestamp
    pub received_at: DateTime<Utc>,
    pub extra: Option<serde_json::Value>,
}

impl Track {
    /// Builds the stored form of a pixel payload.
    ///
    /// Ids are v7 so they sort by creation time within a process.
    pub fn record(owner_id: Uuid, new: NewTrack, ip: Option<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            owner_id,
            user_id: new.user_id,
            anonymous_id: new.anonymous_id,
            page_url: new.page_url,
            page_path: new.page_path,
            page_title: new.page_title,
            page_referrer: new.page_referrer,
            event: new.event,
            ip,
            campaign_source: new.campaign_source,
            campaign_medium: new.campaign_medium,
            campaign_name: new.campaign_name,
            campaign_content: new.campaign_content,
            sent_at: new.sent_at,
            received_at: Utc::now(),
            extra: new.extra,
        }
    }

    /// Campaign name, empty when absent.
    pub fn campaign_name_or_empty(&self) -> &str {
        self.campaign_name.as_deref().unwrap_or("")
    }

    /// Total touch order: send time, then receipt time, then id.
    pub fn touch_order(&self, other: &Self) -> Ordering {
        self.sent_at
            .cmp(&other.sent_at)
            .then_with(|| self.received_at.cmp(&other.received_at))
            .then_with(|| self.id.cmp(&other.id))
    }

    /// Receipt order used by first-touch reporting: receipt time, then id.
    pub fn receipt_order(&self, other: &Self) -> Ordering {
        self.received_at
            .cmp(&other.received_at)
            .then_with(|| self.id.cmp(&other.id))
    }
}
