//! Per-neuron receptive-field inspector.
//!
//! The inspector turns pointer events on rendered nodes into at most one
//! selected [`NeuronHandle`] and builds the overlay for it: a 28×28 swatch of
//! the neuron's receptive field plus a `"Layer l, Neuron n"` label.
//!
//! Lookups always go through the most recently bound [`LayerGrids`] snapshot.
//! A handle that does not resolve (a pointer event racing a redraw) is logged
//! and ignored.

use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use thiserror::Error;
use tracing::warn;

use crate::color::{color_grid, Rgba};
use crate::receptive_field::{LayerGrids, ReceptiveFieldGrid};
use crate::scene::{Scene, Shape};
use crate::tensor::{NeuronHandle, INPUT_SIDE};

/// Which pointer gesture selects a neuron.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Trigger {
    /// Select on pointer-enter, clear on pointer-leave.
    #[default]
    Hover,
    /// Select on click, clear on a click that hits no node.
    Click,
}

impl Trigger {
    pub fn label(self) -> &'static str {
        match self {
            Trigger::Hover => "hover",
            Trigger::Click => "click",
        }
    }

    pub fn parse(s: &str) -> Option<Trigger> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hover" => Some(Trigger::Hover),
            "click" => Some(Trigger::Click),
            _ => None,
        }
    }

    pub fn all() -> &'static [Trigger] {
        &[Trigger::Hover, Trigger::Click]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct InspectorConfig {
    pub trigger: Trigger,
    /// Side of one swatch cell, in pixels.
    pub cell_size: f64,
    pub cell_stroke_width: f64,
    pub border_width: f64,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            trigger: Trigger::Hover,
            cell_size: 5.0,
            cell_stroke_width: 0.5,
            border_width: 2.0,
        }
    }
}

impl InspectorConfig {
    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = trigger;
        self
    }
}

/// Pointer input, already resolved to node identities by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    Enter(NeuronHandle),
    Leave(NeuronHandle),
    /// A click; `None` when it hit no node.
    Click(Option<NeuronHandle>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InspectError {
    #[error("inspector is not bound to any layer grids")]
    Unbound,
    #[error("no receptive field for {handle}")]
    Missing { handle: NeuronHandle },
}

/// What the inspector panel shows for the current selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    handle: NeuronHandle,
    label: String,
    swatch: Scene,
}

impl Overlay {
    fn new(handle: NeuronHandle, grid: &ReceptiveFieldGrid, config: &InspectorConfig) -> Self {
        Self {
            handle,
            label: handle.to_string(),
            swatch: swatch(grid, config),
        }
    }

    pub fn handle(&self) -> NeuronHandle {
        self.handle
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn swatch(&self) -> &Scene {
        &self.swatch
    }
}

/// Paint a receptive field as a block of colored cells with a border.
pub fn swatch(grid: &ReceptiveFieldGrid, config: &InspectorConfig) -> Scene {
    let cell = config.cell_size;
    let extent = INPUT_SIDE as f64 * cell;
    let mut scene = Scene::with_capacity(extent, extent, grid.values().len() + 1);

    for (index, color) in color_grid(grid.values()).into_iter().enumerate() {
        let row = (index / INPUT_SIDE) as f64;
        let col = (index % INPUT_SIDE) as f64;
        scene.push(Shape::Rect {
            x: col * cell,
            y: row * cell,
            width: cell,
            height: cell,
            fill: Some(color),
            stroke: Some(Rgba::LIGHT_GRAY),
            stroke_width: config.cell_stroke_width,
        });
    }

    scene.push(Shape::Rect {
        x: 0.0,
        y: 0.0,
        width: extent,
        height: extent,
        fill: None,
        stroke: Some(Rgba::BLACK),
        stroke_width: config.border_width,
    });
    scene
}

#[derive(Debug, Clone, Default)]
pub struct NeuronInspector {
    config: InspectorConfig,
    grids: Option<Arc<LayerGrids>>,
    selection: Option<NeuronHandle>,
    overlay: Option<Overlay>,
}

impl NeuronInspector {
    pub fn new(config: InspectorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    pub fn trigger(&self) -> Trigger {
        self.config.trigger
    }

    /// Switch trigger mode. Any selection made under the old mode is dropped.
    pub fn set_trigger(&mut self, trigger: Trigger) -> bool {
        if self.config.trigger == trigger {
            return false;
        }
        self.config.trigger = trigger;
        self.clear()
    }

    /// Attach to a new grid snapshot.
    ///
    /// A live selection is rebuilt from the new grids, or dropped if the new
    /// snapshot no longer has that neuron.
    pub fn bind(&mut self, grids: Arc<LayerGrids>) {
        self.grids = Some(grids);
        if let Some(handle) = self.selection {
            if let Err(err) = self.select(handle) {
                warn!(%err, "dropping inspector selection after rebind");
                self.clear();
            }
        }
    }

    /// Feed one pointer event. Returns whether the overlay changed.
    pub fn handle(&mut self, event: PointerEvent) -> bool {
        match (self.config.trigger, event) {
            (Trigger::Hover, PointerEvent::Enter(handle))
            | (Trigger::Click, PointerEvent::Click(Some(handle))) => self.try_select(handle),
            (Trigger::Hover, PointerEvent::Leave(handle)) => {
                if self.selection == Some(handle) {
                    self.clear()
                } else {
                    false
                }
            }
            (Trigger::Click, PointerEvent::Click(None)) => self.clear(),
            _ => false,
        }
    }

    fn try_select(&mut self, handle: NeuronHandle) -> bool {
        match self.select(handle) {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "ignoring pointer event on stale node");
                false
            }
        }
    }

    /// Select `handle`, replacing any current overlay.
    pub fn select(&mut self, handle: NeuronHandle) -> Result<(), InspectError> {
        let grids = self.grids.as_ref().ok_or(InspectError::Unbound)?;
        let grid = grids.get(handle).ok_or(InspectError::Missing { handle })?;
        let overlay = Overlay::new(handle, grid, &self.config);
        self.selection = Some(handle);
        self.overlay = Some(overlay);
        Ok(())
    }

    /// Hide the overlay. Returns whether anything was showing.
    pub fn clear(&mut self) -> bool {
        let had_overlay = self.overlay.take().is_some();
        let had_selection = self.selection.take().is_some();
        had_overlay || had_selection
    }

    pub fn selection(&self) -> Option<NeuronHandle> {
        self.selection
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    /// In-flow status line: the selection label, or empty.
    pub fn status_text(&self) -> &str {
        self.overlay.as_ref().map_or("", |o| o.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::color_for;
    use crate::receptive_field::compute_layer_grids;
    use crate::tensor::{WeightTensor, INPUT_PIXELS};

    fn grids() -> Arc<LayerGrids> {
        let mut a = vec![0.0; INPUT_PIXELS];
        a[0] = 1.0;
        let mut b = vec![0.0; INPUT_PIXELS];
        b[1] = -1.0;
        Arc::new(compute_layer_grids(&WeightTensor::new(vec![
            vec![a, b],
            vec![vec![1.0, 0.0]],
        ])))
    }

    fn h(layer: usize, neuron: usize) -> NeuronHandle {
        NeuronHandle::new(layer, neuron)
    }

    #[test]
    fn hover_selects_and_clears() {
        let mut insp = NeuronInspector::default();
        insp.bind(grids());

        assert!(insp.handle(PointerEvent::Enter(h(0, 1))));
        assert_eq!(insp.selection(), Some(h(0, 1)));
        assert_eq!(insp.status_text(), "Layer 0, Neuron 1");

        // Clicks do nothing in hover mode.
        assert!(!insp.handle(PointerEvent::Click(None)));
        assert_eq!(insp.selection(), Some(h(0, 1)));

        assert!(insp.handle(PointerEvent::Leave(h(0, 1))));
        assert_eq!(insp.selection(), None);
        assert!(insp.overlay().is_none());
        assert_eq!(insp.status_text(), "");
    }

    #[test]
    fn entering_a_new_node_replaces_the_overlay() {
        let mut insp = NeuronInspector::default();
        insp.bind(grids());
        insp.handle(PointerEvent::Enter(h(0, 0)));
        insp.handle(PointerEvent::Enter(h(1, 0)));
        assert_eq!(insp.overlay().map(Overlay::handle), Some(h(1, 0)));

        // A late leave for the old node does not clear the new selection.
        assert!(!insp.handle(PointerEvent::Leave(h(0, 0))));
        assert_eq!(insp.selection(), Some(h(1, 0)));
    }

    #[test]
    fn click_mode() {
        let mut insp = NeuronInspector::new(InspectorConfig::default().with_trigger(Trigger::Click));
        insp.bind(grids());

        assert!(!insp.handle(PointerEvent::Enter(h(0, 0))));
        assert_eq!(insp.selection(), None);

        assert!(insp.handle(PointerEvent::Click(Some(h(0, 0)))));
        assert!(!insp.handle(PointerEvent::Leave(h(0, 0))));
        assert_eq!(insp.selection(), Some(h(0, 0)));

        assert!(insp.handle(PointerEvent::Click(Some(h(0, 1)))));
        assert_eq!(insp.selection(), Some(h(0, 1)));

        assert!(insp.handle(PointerEvent::Click(None)));
        assert_eq!(insp.selection(), None);
    }

    #[test]
    fn stale_handles_are_ignored() {
        let mut insp = NeuronInspector::default();
        assert_eq!(insp.select(h(0, 0)), Err(InspectError::Unbound));

        insp.bind(grids());
        insp.handle(PointerEvent::Enter(h(0, 0)));
        assert!(!insp.handle(PointerEvent::Enter(h(5, 0))));
        assert!(!insp.handle(PointerEvent::Enter(h(0, 9))));
        assert_eq!(insp.selection(), Some(h(0, 0)));
        assert_eq!(
            insp.select(h(1, 3)),
            Err(InspectError::Missing { handle: h(1, 3) })
        );
    }

    #[test]
    fn rebind_refreshes_or_drops_selection() {
        let mut insp = NeuronInspector::default();
        insp.bind(grids());
        insp.handle(PointerEvent::Enter(h(1, 0)));

        insp.bind(grids());
        assert_eq!(insp.selection(), Some(h(1, 0)));

        let single = Arc::new(compute_layer_grids(&WeightTensor::new(vec![vec![vec![
            0.5;
            INPUT_PIXELS
        ]]])));
        insp.bind(single);
        assert_eq!(insp.selection(), None);
        assert!(insp.overlay().is_none());
    }

    #[test]
    fn swatch_paints_every_cell_and_a_border() {
        let mut insp = NeuronInspector::default();
        insp.bind(grids());
        insp.select(h(0, 1)).unwrap();
        let swatch = insp.overlay().unwrap().swatch();

        assert_eq!(swatch.len(), INPUT_PIXELS + 1);
        assert_eq!(swatch.width(), 140.0);
        match swatch.shapes()[1] {
            Shape::Rect { x, y, fill, stroke, .. } => {
                assert_eq!((x, y), (5.0, 0.0));
                assert_eq!(fill, Some(color_for(-1.0)));
                assert_eq!(stroke, Some(Rgba::LIGHT_GRAY));
            }
            ref other => panic!("unexpected shape {other:?}"),
        }
        match swatch.shapes()[INPUT_PIXELS] {
            Shape::Rect { fill, stroke_width, .. } => {
                assert_eq!(fill, None);
                assert_eq!(stroke_width, 2.0);
            }
            ref other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn switching_trigger_clears_selection() {
        let mut insp = NeuronInspector::default();
        insp.bind(grids());
        insp.handle(PointerEvent::Enter(h(0, 0)));
        assert!(insp.set_trigger(Trigger::Click));
        assert_eq!(insp.selection(), None);
        assert!(!insp.set_trigger(Trigger::Click));
    }

    #[test]
    fn trigger_parse_round_trips_labels() {
        for &t in Trigger::all() {
            assert_eq!(Trigger::parse(t.label()), Some(t));
        }
        assert_eq!(Trigger::parse(" Click "), Some(Trigger::Click));
        assert_eq!(Trigger::parse("tap"), None);
    }
}
