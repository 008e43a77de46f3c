//! The update record pushed by the training backend.
//!
//! Every field is optional: the backend sends batch ticks, epoch summaries,
//! status messages and weight snapshots as separate events. Unknown fields
//! (for example precomputed grids) are ignored.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "serde")]
use thiserror::Error;

use crate::tensor::WeightTensor;

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UpdateEvent {
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub epoch: Option<u64>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub batch: Option<u64>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub weights: Option<WeightTensor>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub avg_error: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub error: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub message: Option<String>,
}

impl UpdateEvent {
    pub fn with_weights(weights: WeightTensor) -> Self {
        Self {
            weights: Some(weights),
            ..Self::default()
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn has_weights(&self) -> bool {
        self.weights.is_some()
    }
}

#[cfg(feature = "serde")]
#[derive(Debug, Error)]
pub enum EventError {
    #[error("malformed update event: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(feature = "serde")]
impl UpdateEvent {
    pub fn from_json(text: &str) -> Result<Self, EventError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Decode an event payload that was already parsed, e.g. the data
    /// argument of a Socket.IO `EVENT` packet.
    pub fn from_value(value: serde_json::Value) -> Result<Self, EventError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json(&self) -> Result<String, EventError> {
        Ok(serde_json::to_string(self)?)
    }
}
