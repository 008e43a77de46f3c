//! # netscope
//!
//! Live visualization core for a small feed-forward network trained on
//! 28×28 images.
//!
//! Each weight update produces three things: per-neuron receptive fields
//! over the input image, a node-link diagram of the network, and (for the
//! neuron under the pointer) an inspector overlay showing that neuron's
//! receptive field as a colored swatch.
//!
//! ## Quick Start
//!
//! ```
//! use netscope::prelude::*;
//!
//! let weights = WeightTensor::new(vec![vec![vec![0.0; INPUT_PIXELS]; 2]]);
//! let mut view = NetworkView::new(ViewConfig::default());
//! view.apply_update(UpdateEvent::with_weights(weights));
//!
//! let node = view.scene().node(NeuronHandle::new(0, 1)).unwrap();
//! view.pointer_move(node.cx, node.cy);
//! assert_eq!(view.overlay().unwrap().label(), "Layer 0, Neuron 1");
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): JSON update events and serializable configs
//! - `cli` (default): the `netscope-cli` binary
//! - `parallel`: Compute receptive fields of a layer on rayon
//! - `simd`: SIMD accumulation via the `wide` crate
//!
//! ## Modules
//!
//! - [`receptive_field`]: Receptive-field propagation and normalization
//! - [`render`]: Network diagram layout
//! - [`inspector`]: Per-neuron overlay selection
//! - [`view`]: Host-agnostic state tying the pieces together

#[path = "core/float_fmt.rs"]
pub mod float_fmt;

#[path = "core/color.rs"]
pub mod color;

#[path = "core/tensor.rs"]
pub mod tensor;

#[path = "core/receptive_field.rs"]
pub mod receptive_field;

#[path = "core/scene.rs"]
pub mod scene;

#[path = "core/render.rs"]
pub mod render;

#[path = "core/inspector.rs"]
pub mod inspector;

#[path = "core/event.rs"]
pub mod event;

#[path = "core/status.rs"]
pub mod status;

#[path = "core/view.rs"]
pub mod view;

/// Prelude module for convenient imports.
///
/// ```
/// use netscope::prelude::*;
/// ```
pub mod prelude {
    pub use crate::color::{color_for, color_grid, intensity, Rgba};
    #[cfg(feature = "serde")]
    pub use crate::event::EventError;
    pub use crate::event::UpdateEvent;
    pub use crate::inspector::{
        InspectError, InspectorConfig, NeuronInspector, Overlay, PointerEvent, Trigger,
    };
    pub use crate::receptive_field::{
        compute_layer_grids, compute_layer_grids_with, ExecutionTier, LayerGrids, NeuronFault,
        ReceptiveFieldGrid,
    };
    pub use crate::render::{LayoutConfig, NetworkRenderer};
    pub use crate::scene::{NodePosition, Scene, Shape};
    pub use crate::status::TrainingStatus;
    pub use crate::tensor::{NeuronHandle, Weight, WeightTensor, INPUT_PIXELS, INPUT_SIDE};
    pub use crate::view::{NetworkView, ViewConfig};
}
