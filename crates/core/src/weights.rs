//! Attribution weight accumulation.
//!
//! Each KPI carries a nested weight structure:
//! model → attribute → observed value → accumulated weight.
//! Levels are created lazily on first write. The structure is persisted
//! as an opaque JSON blob, e.g. `{"firstTouch":{"campaignName":{"Ads":1.0}}}`.
//!
//! Weights always serialize with a fractional part (`1.0`, never `1`).
//! Blobs written by other tools as integers parse to the same weights, so
//! compare blobs as parsed JSON, not as strings.
//!
//! Weights are plain `f64`. Negative deltas are applied as-is and may take a
//! weight below zero.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ValidationErrorCode};
use crate::kpi::Kpi;

/// Attribute key holding campaign-name weights.
pub const CAMPAIGN_NAME_ATTRIBUTE: &str = "campaignName";

/// Attribution model identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributionModel {
    /// Credit goes to the earliest touch before conversion.
    FirstTouch,
}

impl AttributionModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstTouch => "firstTouch",
        }
    }
}

impl fmt::Display for AttributionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributionModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "firstTouch" => Ok(Self::FirstTouch),
            other => Err(Error::validation(
                ValidationErrorCode::InvalidFormat,
                format!("unknown attribution model '{}'", other),
            )),
        }
    }
}

type AttributeWeights = BTreeMap<String, BTreeMap<String, f64>>;

/// Typed weight structure attached to a KPI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightData(BTreeMap<AttributionModel, AttributeWeights>);

impl WeightData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a stored blob. An empty blob is an empty structure.
    pub fn from_blob(blob: &str) -> Result<Self> {
        let trimmed = blob.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(trimmed)?)
    }

    /// Serializes to the stored blob form.
    pub fn to_blob(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All value weights recorded for one attribute of a model.
    pub fn attribute(
        &self,
        model: AttributionModel,
        attribute: &str,
    ) -> Option<&BTreeMap<String, f64>> {
        self.0.get(&model)?.get(attribute)
    }

    /// Current weight for a key.
    pub fn weight(&self, model: AttributionModel, attribute: &str, key: &str) -> Option<f64> {
        self.attribute(model, attribute)?.get(key).copied()
    }

    /// Adds `delta` to the weight for `key`, creating missing levels.
    ///
    /// Returns true when any level was created or the stored value moved.
    pub fn adjust(
        &mut self,
        model: AttributionModel,
        attribute: &str,
        key: &str,
        delta: f64,
    ) -> bool {
        let mut changed = false;

        let attributes = match self.0.entry(model) {
            Entry::Vacant(e) => {
                changed = true;
                e.insert(BTreeMap::new())
            }
            Entry::Occupied(e) => e.into_mut(),
        };

        let keys = match attributes.entry(attribute.to_string()) {
            Entry::Vacant(e) => {
                changed = true;
                e.insert(BTreeMap::new())
            }
            Entry::Occupied(e) => e.into_mut(),
        };

        match keys.entry(key.to_string()) {
            Entry::Vacant(e) => {
                e.insert(delta);
                changed = true;
            }
            Entry::Occupied(mut e) => {
                let current = *e.get();
                let next = current + delta;
                if next != current {
                    e.insert(next);
                    changed = true;
                }
            }
        }

        changed
    }

    /// Drops every weight recorded under `model`.
    pub fn clear_model(&mut self, model: AttributionModel) -> bool {
        self.0.remove(&model).is_some()
    }
}

/// Adjusts a KPI's weight in place. The caller persists the KPI when this
/// returns true.
pub fn adjust_weight(
    kpi: &mut Kpi,
    model: AttributionModel,
    attribute: &str,
    key: &str,
    delta: f64,
) -> bool {
    kpi.weight_data.adjust(model, attribute, key, delta)
}

/// Removes a model's weights from a KPI. No-op when the model is absent.
pub fn clear_weights_for_model(kpi: &mut Kpi, model: AttributionModel) -> bool {
    kpi.weight_data.clear_model(model)
}
