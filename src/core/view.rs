//! Host-agnostic visualizer state.
//!
//! [`NetworkView`] owns the latest weight snapshot together with everything
//! derived from it (receptive-field grids, the rendered scene, the inspector
//! binding) and keeps them in step. Hosts feed it update events and raw
//! pointer coordinates, then repaint whatever [`NetworkView::revision`] says
//! has changed.

use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use tracing::{debug, trace};

use crate::event::UpdateEvent;
use crate::inspector::{InspectorConfig, NeuronInspector, Overlay, PointerEvent, Trigger};
use crate::receptive_field::{compute_layer_grids_with, ExecutionTier, LayerGrids};
use crate::render::{LayoutConfig, NetworkRenderer};
use crate::scene::Scene;
use crate::status::TrainingStatus;
use crate::tensor::{NeuronHandle, WeightTensor};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ViewConfig {
    pub layout: LayoutConfig,
    pub inspector: InspectorConfig,
    pub tier: ExecutionTier,
    pub draw_weights: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            inspector: InspectorConfig::default(),
            tier: ExecutionTier::default(),
            draw_weights: true,
        }
    }
}

impl ViewConfig {
    pub fn with_tier(mut self, tier: ExecutionTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_draw_weights(mut self, draw_weights: bool) -> Self {
        self.draw_weights = draw_weights;
        self
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.inspector.trigger = trigger;
        self
    }
}

#[derive(Debug, Clone)]
pub struct NetworkView {
    renderer: NetworkRenderer,
    inspector: NeuronInspector,
    tier: ExecutionTier,
    draw_weights: bool,
    status: TrainingStatus,
    weights: Option<Arc<WeightTensor>>,
    grids: Arc<LayerGrids>,
    scene: Scene,
    hovered: Option<NeuronHandle>,
    revision: u64,
}

impl Default for NetworkView {
    fn default() -> Self {
        Self::new(ViewConfig::default())
    }
}

impl NetworkView {
    pub fn new(config: ViewConfig) -> Self {
        let grids = Arc::new(LayerGrids::default());
        let mut inspector = NeuronInspector::new(config.inspector);
        inspector.bind(Arc::clone(&grids));
        Self {
            renderer: NetworkRenderer::new(config.layout),
            inspector,
            tier: config.tier,
            draw_weights: config.draw_weights,
            status: TrainingStatus::default(),
            weights: None,
            grids,
            scene: Scene::new(config.layout.canvas_width, 0.0),
            hovered: None,
            revision: 0,
        }
    }

    /// Merge an update. Returns whether the diagram was redrawn.
    pub fn apply_update(&mut self, event: UpdateEvent) -> bool {
        self.status.apply(&event);
        match event.weights {
            Some(weights) => {
                self.set_weights(weights);
                true
            }
            None => false,
        }
    }

    /// Replace the weight snapshot, recompute grids and redraw.
    pub fn set_weights(&mut self, weights: WeightTensor) {
        let grids = compute_layer_grids_with(&weights, self.tier);
        self.weights = Some(Arc::new(weights));
        self.grids = Arc::new(grids);
        self.redraw();
    }

    /// Toggle edge drawing. Always redraws, even when the flag is unchanged.
    pub fn set_draw_weights(&mut self, draw_weights: bool) {
        self.draw_weights = draw_weights;
        self.redraw();
    }

    pub fn set_trigger(&mut self, trigger: Trigger) -> bool {
        let changed = self.inspector.set_trigger(trigger);
        if changed {
            self.revision += 1;
        }
        changed
    }

    /// Rebuild the scene from the current snapshot. No-op before the first
    /// weights arrive.
    pub fn redraw(&mut self) {
        let Some(weights) = self.weights.as_ref() else {
            trace!("redraw skipped: no weights yet");
            return;
        };
        self.scene = self.renderer.render(weights, self.draw_weights);
        self.inspector.bind(Arc::clone(&self.grids));

        if let Some(handle) = self.hovered {
            if self.scene.node(handle).is_none() {
                self.hovered = None;
                self.inspector.handle(PointerEvent::Leave(handle));
            }
        }

        self.revision += 1;
        debug!(revision = self.revision, shapes = self.scene.len(), "view redrawn");
    }

    /// Pointer moved to `(x, y)` in canvas coordinates. Returns whether the
    /// overlay changed.
    pub fn pointer_move(&mut self, x: f64, y: f64) -> bool {
        let hit = self.scene.node_at(x, y);
        if hit == self.hovered {
            return false;
        }
        let mut changed = false;
        if let Some(prev) = self.hovered.take() {
            changed |= self.inspector.handle(PointerEvent::Leave(prev));
        }
        if let Some(next) = hit {
            changed |= self.inspector.handle(PointerEvent::Enter(next));
        }
        self.hovered = hit;
        self.bump(changed)
    }

    /// Pointer left the canvas.
    pub fn pointer_leave(&mut self) -> bool {
        let changed = match self.hovered.take() {
            Some(prev) => self.inspector.handle(PointerEvent::Leave(prev)),
            None => false,
        };
        self.bump(changed)
    }

    pub fn pointer_click(&mut self, x: f64, y: f64) -> bool {
        let hit = self.scene.node_at(x, y);
        let changed = self.inspector.handle(PointerEvent::Click(hit));
        self.bump(changed)
    }

    fn bump(&mut self, changed: bool) -> bool {
        if changed {
            self.revision += 1;
        }
        changed
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn grids(&self) -> &Arc<LayerGrids> {
        &self.grids
    }

    pub fn weights(&self) -> Option<&WeightTensor> {
        self.weights.as_deref()
    }

    pub fn status(&self) -> &TrainingStatus {
        &self.status
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.inspector.overlay()
    }

    pub fn inspector(&self) -> &NeuronInspector {
        &self.inspector
    }

    pub fn draw_weights(&self) -> bool {
        self.draw_weights
    }

    pub fn hovered(&self) -> Option<NeuronHandle> {
        self.hovered
    }

    /// Bumped on every redraw and every overlay change.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}
