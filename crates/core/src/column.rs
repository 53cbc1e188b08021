//! Closed mapping from KPI column names to track fields.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigErrorCode, Error};
use crate::track::Track;

/// Track field a KPI can match on or a journey can group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchColumn {
    PageUrl,
    PagePath,
    PageTitle,
    PageReferrer,
    Event,
    CampaignSource,
    CampaignMedium,
    CampaignName,
    CampaignContent,
}

impl MatchColumn {
    pub const ALL: [MatchColumn; 9] = [
        Self::PageUrl,
        Self::PagePath,
        Self::PageTitle,
        Self::PageReferrer,
        Self::Event,
        Self::CampaignSource,
        Self::CampaignMedium,
        Self::CampaignName,
        Self::CampaignContent,
    ];

    /// Column name as stored in KPI rules and storage schemas.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PageUrl => "page_url",
            Self::PagePath => "page_path",
            Self::PageTitle => "page_title",
            Self::PageReferrer => "page_referrer",
            Self::Event => "event",
            Self::CampaignSource => "campaign_source",
            Self::CampaignMedium => "campaign_medium",
            Self::CampaignName => "campaign_name",
            Self::CampaignContent => "campaign_content",
        }
    }

    /// Reads the stored value of this column from a track.
    pub fn value_of<'a>(&self, track: &'a Track) -> Option<&'a str> {
        let value = match self {
            Self::PageUrl => &track.page_url,
            Self::PagePath => &track.page_path,
            Self::PageTitle => &track.page_title,
            Self::PageReferrer => &track.page_referrer,
            Self::Event => &track.event,
            Self::CampaignSource => &track.campaign_source,
            Self::CampaignMedium => &track.campaign_medium,
            Self::CampaignName => &track.campaign_name,
            Self::CampaignContent => &track.campaign_content,
        };
        value.as_deref()
    }

    /// Whether the track carries a non-empty value in this column.
    pub fn is_present(&self, track: &Track) -> bool {
        self.value_of(track).is_some_and(|v| !v.is_empty())
    }
}

impl fmt::Display for MatchColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchColumn {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                Error::configuration(
                    ConfigErrorCode::UnknownColumn,
                    format!("column '{}' is not a known track field", s),
                )
            })
    }
}
