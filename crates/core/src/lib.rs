//! Core types, rules and storage contracts for the attribution engine.

pub mod aggregate;
pub mod column;
pub mod conversion;
pub mod error;
pub mod kpi;
pub mod limits;
pub mod matcher;
pub mod store;
pub mod track;
pub mod validation;
pub mod weights;

pub use aggregate::*;
pub use column::MatchColumn;
pub use conversion::Conversion;
pub use error::{Error, Result};
pub use kpi::*;
pub use store::*;
pub use track::*;
pub use weights::*;
