//! Size limits for tracked payloads and KPI definitions.
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so field limits are duplicated there. Keep both in sync when modifying.

// === Payload Limits ===

/// Maximum decoded pixel payload size in bytes (32KB).
pub const MAX_PIXEL_PAYLOAD_BYTES: usize = 32 * 1024;

/// Maximum opaque extra JSON size in bytes (16KB).
pub const MAX_EXTRA_BYTES: usize = 16 * 1024;

// === Track Field Limits (chars) ===

/// Visitor and user id max length.
/// UUIDs=36, emails=~50, custom IDs up to 128.
pub const MAX_ID_LEN: usize = 128;

/// Page URL, path and referrer max length.
pub const MAX_URL_LEN: usize = 2048;

pub const MAX_PAGE_TITLE_LEN: usize = 500;

/// Event name max length.
pub const MAX_EVENT_NAME_LEN: usize = 100;

/// Campaign source/medium/name/content max length.
pub const MAX_CAMPAIGN_LEN: usize = 256;

// === KPI Limits ===

pub const MAX_KPI_NAME_LEN: usize = 200;

/// Match value max length. Matches the longest track field.
pub const MAX_MATCH_VALUE_LEN: usize = 2048;
