//! Node-link diagram layout and rendering.
//!
//! The leftmost band of the canvas holds a static 28×28 placeholder for the
//! input image; each layer then gets its own column of neurons to the right.
//! Every render builds a brand-new [`Scene`] in three passes:
//!
//! 1. input placeholder cells,
//! 2. edges (only when weights are drawn), colored by [`color_for`],
//! 3. neuron circles, tagged with their [`NeuronHandle`].
//!
//! Edges are always emitted before nodes so they stay underneath them, and
//! node positions never depend on whether edges are drawn.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use tracing::debug;

use crate::color::{color_for, Rgba};
use crate::scene::{Scene, Shape};
use crate::tensor::{NeuronHandle, WeightTensor, INPUT_PIXELS, INPUT_SIDE};

/// Geometry of the diagram, in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LayoutConfig {
    /// Horizontal distance between consecutive layer columns.
    pub layer_spacing: f64,
    /// Vertical distance between neurons of the same layer.
    pub neuron_spacing: f64,
    /// Side of one input placeholder cell.
    pub grid_spacing: f64,
    /// Left edge of the input placeholder grid.
    pub grid_offset_x: f64,
    pub canvas_width: f64,
    /// Extra height added below the tallest layer.
    pub vertical_padding: f64,
    pub neuron_radius: f64,
    /// Edge stroke width per unit of |weight|.
    pub edge_width_scale: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            layer_spacing: 150.0,
            neuron_spacing: 30.0,
            grid_spacing: 5.0,
            grid_offset_x: 50.0,
            canvas_width: 1000.0,
            vertical_padding: 50.0,
            neuron_radius: 8.0,
            edge_width_scale: 2.0,
        }
    }
}

impl LayoutConfig {
    /// Width (and height) of the input placeholder grid.
    pub fn input_grid_extent(&self) -> f64 {
        INPUT_SIDE as f64 * self.grid_spacing
    }
}

#[derive(Debug, Clone, Default)]
pub struct NetworkRenderer {
    layout: LayoutConfig,
}

impl NetworkRenderer {
    pub fn new(layout: LayoutConfig) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// `max neurons in any layer * neuron_spacing + padding`.
    pub fn canvas_height(&self, weights: &WeightTensor) -> f64 {
        weights.max_layer_width() as f64 * self.layout.neuron_spacing + self.layout.vertical_padding
    }

    /// X of every neuron in `layer`.
    pub fn layer_x(&self, layer: usize) -> f64 {
        (layer + 1) as f64 * self.layout.layer_spacing
            + self.layout.grid_offset_x
            + self.layout.input_grid_extent()
    }

    /// Y of neuron `neuron` in a layer of `layer_len` neurons; each layer is
    /// centered on its own.
    pub fn neuron_y(&self, layer_len: usize, neuron: usize, canvas_height: f64) -> f64 {
        let layer_height = layer_len as f64 * self.layout.neuron_spacing;
        let layer_offset_y = (canvas_height - layer_height) / 2.0;
        neuron as f64 * self.layout.neuron_spacing + layer_offset_y
    }

    /// Top edge of the input placeholder grid.
    pub fn grid_offset_y(&self, canvas_height: f64) -> f64 {
        (canvas_height - self.layout.input_grid_extent()) / 2.0
    }

    /// Center of input pixel `index` (row-major).
    pub fn input_center(&self, index: usize, canvas_height: f64) -> (f64, f64) {
        let gs = self.layout.grid_spacing;
        let col = (index % INPUT_SIDE) as f64;
        let row = (index / INPUT_SIDE) as f64;
        (
            col * gs + self.layout.grid_offset_x + gs / 2.0,
            row * gs + self.grid_offset_y(canvas_height) + gs / 2.0,
        )
    }

    /// Build a fresh scene for `weights`.
    ///
    /// Malformed neurons still get a node; their edges are drawn only for
    /// source indices that exist, and non-finite weights get no edge.
    pub fn render(&self, weights: &WeightTensor, draw_weights: bool) -> Scene {
        let height = self.canvas_height(weights);
        let edge_estimate = if draw_weights {
            weights.layers().iter().flatten().map(Vec::len).sum::<usize>()
        } else {
            0
        };
        let mut scene = Scene::with_capacity(
            self.layout.canvas_width,
            height,
            INPUT_PIXELS + edge_estimate + weights.neuron_count(),
        );

        self.draw_input_grid(&mut scene, height);
        if draw_weights {
            self.draw_edges(&mut scene, weights, height);
        }
        self.draw_nodes(&mut scene, weights, height);

        debug!(
            layers = weights.len(),
            shapes = scene.len(),
            draw_weights,
            "network rendered"
        );
        scene
    }

    fn draw_input_grid(&self, scene: &mut Scene, height: f64) {
        let gs = self.layout.grid_spacing;
        let offset_y = self.grid_offset_y(height);
        for i in 0..INPUT_SIDE {
            for j in 0..INPUT_SIDE {
                scene.push(Shape::Rect {
                    x: j as f64 * gs + self.layout.grid_offset_x,
                    y: i as f64 * gs + offset_y,
                    width: gs,
                    height: gs,
                    fill: Some(Rgba::LIGHT_GRAY),
                    stroke: Some(Rgba::BLACK),
                    stroke_width: 1.0,
                });
            }
        }
    }

    fn draw_edges(&self, scene: &mut Scene, weights: &WeightTensor, height: f64) {
        let layers = weights.layers();
        for (l, layer) in layers.iter().enumerate() {
            let x = self.layer_x(l);
            let sources = weights.expected_fan_in(l);

            for (n, neuron) in layer.iter().enumerate() {
                let y = self.neuron_y(layer.len(), n, height);
                for (p, &w) in neuron.iter().enumerate().take(sources) {
                    if !w.is_finite() {
                        continue;
                    }
                    let (x1, y1) = if l == 0 {
                        self.input_center(p, height)
                    } else {
                        (self.layer_x(l - 1), self.neuron_y(sources, p, height))
                    };
                    scene.push(Shape::Line {
                        x1,
                        y1,
                        x2: x,
                        y2: y,
                        stroke: color_for(w),
                        stroke_width: w.abs() as f64 * self.layout.edge_width_scale,
                    });
                }
            }
        }
    }

    fn draw_nodes(&self, scene: &mut Scene, weights: &WeightTensor, height: f64) {
        for (l, layer) in weights.layers().iter().enumerate() {
            let x = self.layer_x(l);
            for n in 0..layer.len() {
                scene.push(Shape::Circle {
                    cx: x,
                    cy: self.neuron_y(layer.len(), n, height),
                    r: self.layout.neuron_radius,
                    fill: Rgba::BLACK,
                    node: NeuronHandle::new(l, n),
                });
            }
        }
    }
}
