//! Weight tensor model: layers of neurons, each holding its incoming weights.
//!
//! Layer 0 reads from the flattened 28×28 input image, so every neuron in it
//! should carry [`INPUT_PIXELS`] weights; a neuron in layer `l > 0` should carry
//! one weight per neuron of layer `l - 1`. Nothing here rejects tensors that
//! break those rules: shape problems are isolated per neuron further down.

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize};

/// Type alias for a single connection weight.
pub type Weight = f32;

/// Incoming weights of one neuron.
pub type NeuronWeights = Vec<Weight>;

/// Neurons of one layer.
pub type Layer = Vec<NeuronWeights>;

/// Side length of the square input image.
pub const INPUT_SIDE: usize = 28;

/// Number of input pixels (`INPUT_SIDE²`).
pub const INPUT_PIXELS: usize = INPUT_SIDE * INPUT_SIDE;

/// Identity of a rendered neuron: `(layer, neuron)`.
///
/// Only ever used as a lookup key into per-update snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NeuronHandle {
    pub layer: usize,
    pub neuron: usize,
}

impl NeuronHandle {
    pub const fn new(layer: usize, neuron: usize) -> Self {
        Self { layer, neuron }
    }
}

impl core::fmt::Display for NeuronHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Layer {}, Neuron {}", self.layer, self.neuron)
    }
}

/// The weights of every layer, as delivered by one update event.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(transparent))]
pub struct WeightTensor {
    layers: Vec<Layer>,
}

impl WeightTensor {
    pub fn new(layers: Vec<Layer>) -> Self {
        Self { layers }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&[NeuronWeights]> {
        self.layers.get(index).map(Vec::as_slice)
    }

    pub fn neuron(&self, handle: NeuronHandle) -> Option<&[Weight]> {
        self.layers
            .get(handle.layer)?
            .get(handle.neuron)
            .map(Vec::as_slice)
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Total neuron count across all layers.
    pub fn neuron_count(&self) -> usize {
        self.layers.iter().map(Vec::len).sum()
    }

    /// Neuron count of the widest layer (0 for an empty tensor).
    pub fn max_layer_width(&self) -> usize {
        self.layers.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Fan-in a well-formed neuron of `layer` should have.
    pub fn expected_fan_in(&self, layer: usize) -> usize {
        match layer {
            0 => INPUT_PIXELS,
            l => self.layers.get(l - 1).map_or(0, Vec::len),
        }
    }
}

impl From<Vec<Layer>> for WeightTensor {
    fn from(layers: Vec<Layer>) -> Self {
        Self::new(layers)
    }
}

/// A weight entry that decodes non-numeric JSON (null, strings, ...) as NaN,
/// leaving the owning neuron to be flagged instead of failing the event.
#[cfg(feature = "serde")]
struct LenientWeight(Weight);

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for LenientWeight {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(LenientWeight(
            value.as_f64().map_or(Weight::NAN, |v| v as Weight),
        ))
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for WeightTensor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<Vec<Vec<LenientWeight>>>::deserialize(deserializer)?;
        let layers = raw
            .into_iter()
            .map(|layer| {
                layer
                    .into_iter()
                    .map(|neuron| neuron.into_iter().map(|w| w.0).collect())
                    .collect()
            })
            .collect();
        Ok(WeightTensor::new(layers))
    }
}
