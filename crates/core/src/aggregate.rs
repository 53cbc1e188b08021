//! Read-side projection rows. Never persisted.

use serde::{Deserialize, Serialize};

/// A distinct value and how often it was seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: String,
    pub count: u64,
}

/// A value seen at a 1-based position before conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionAggregate {
    pub value: String,
    pub position: u32,
    pub count: u64,
}
