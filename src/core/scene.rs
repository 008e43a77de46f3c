//! Retained display list produced by a render.
//!
//! A `Scene` is what the renderer hands to a host: browser hosts paint it onto
//! a canvas, native hosts export it as SVG. Shapes are kept in draw order, so
//! later shapes occlude earlier ones.

use crate::color::Rgba;
use crate::float_fmt::push_f64_fixed;
use crate::tensor::NeuronHandle;

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        /// `None` leaves the interior unpainted.
        fill: Option<Rgba>,
        stroke: Option<Rgba>,
        stroke_width: f64,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        stroke: Rgba,
        stroke_width: f64,
    },
    /// A neuron node, tagged with its identity for pointer lookups.
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
        fill: Rgba,
        node: NeuronHandle,
    },
}

/// Position of a rendered neuron.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodePosition {
    pub handle: NeuronHandle,
    pub cx: f64,
    pub cy: f64,
    pub r: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneStats {
    pub rects: usize,
    pub lines: usize,
    pub circles: usize,
}

impl SceneStats {
    pub fn total(&self) -> usize {
        self.rects + self.lines + self.circles
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    width: f64,
    height: f64,
    shapes: Vec<Shape>,
}

impl Scene {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            shapes: Vec::new(),
        }
    }

    pub fn with_capacity(width: f64, height: f64, capacity: usize) -> Self {
        Self {
            width,
            height,
            shapes: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Every tagged node, in draw order.
    pub fn nodes(&self) -> impl Iterator<Item = NodePosition> + '_ {
        self.shapes.iter().filter_map(|s| match *s {
            Shape::Circle {
                cx, cy, r, node, ..
            } => Some(NodePosition {
                handle: node,
                cx,
                cy,
                r,
            }),
            _ => None,
        })
    }

    pub fn node(&self, handle: NeuronHandle) -> Option<NodePosition> {
        self.nodes().find(|n| n.handle == handle)
    }

    /// The topmost node containing `(x, y)`, if any.
    pub fn node_at(&self, x: f64, y: f64) -> Option<NeuronHandle> {
        self.shapes.iter().rev().find_map(|s| match *s {
            Shape::Circle {
                cx, cy, r, node, ..
            } => {
                let dx = x - cx;
                let dy = y - cy;
                (dx * dx + dy * dy <= r * r).then_some(node)
            }
            _ => None,
        })
    }

    pub fn stats(&self) -> SceneStats {
        let mut stats = SceneStats::default();
        for shape in &self.shapes {
            match shape {
                Shape::Rect { .. } => stats.rects += 1,
                Shape::Line { .. } => stats.lines += 1,
                Shape::Circle { .. } => stats.circles += 1,
            }
        }
        stats
    }

    /// Standalone SVG document. Nodes carry `data-layer` / `data-neuron`.
    pub fn to_svg(&self) -> String {
        let mut out = String::with_capacity(64 + self.shapes.len() * 96);
        out.push_str(r#"<svg xmlns="http://www.w3.org/2000/svg" width=""#);
        push_num(&mut out, self.width);
        out.push_str(r#"" height=""#);
        push_num(&mut out, self.height);
        out.push_str("\">\n");

        for shape in &self.shapes {
            match shape {
                Shape::Rect {
                    x,
                    y,
                    width,
                    height,
                    fill,
                    stroke,
                    stroke_width,
                } => {
                    out.push_str("<rect");
                    push_attr(&mut out, "x", *x);
                    push_attr(&mut out, "y", *y);
                    push_attr(&mut out, "width", *width);
                    push_attr(&mut out, "height", *height);
                    push_paint(&mut out, "fill", *fill);
                    push_paint(&mut out, "stroke", *stroke);
                    push_attr(&mut out, "stroke-width", *stroke_width);
                    out.push_str("/>\n");
                }
                Shape::Line {
                    x1,
                    y1,
                    x2,
                    y2,
                    stroke,
                    stroke_width,
                } => {
                    out.push_str("<line");
                    push_attr(&mut out, "x1", *x1);
                    push_attr(&mut out, "y1", *y1);
                    push_attr(&mut out, "x2", *x2);
                    push_attr(&mut out, "y2", *y2);
                    push_paint(&mut out, "stroke", Some(*stroke));
                    push_attr(&mut out, "stroke-width", *stroke_width);
                    out.push_str("/>\n");
                }
                Shape::Circle {
                    cx,
                    cy,
                    r,
                    fill,
                    node,
                } => {
                    out.push_str("<circle");
                    push_attr(&mut out, "cx", *cx);
                    push_attr(&mut out, "cy", *cy);
                    push_attr(&mut out, "r", *r);
                    push_paint(&mut out, "fill", Some(*fill));
                    out.push_str(" data-layer=\"");
                    out.push_str(&node.layer.to_string());
                    out.push_str("\" data-neuron=\"");
                    out.push_str(&node.neuron.to_string());
                    out.push_str("\"/>\n");
                }
            }
        }

        out.push_str("</svg>\n");
        out
    }
}

fn push_num(out: &mut String, v: f64) {
    push_f64_fixed(out, v, 2, true);
}

fn push_attr(out: &mut String, name: &str, v: f64) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    push_num(out, v);
    out.push('"');
}

fn push_paint(out: &mut String, name: &str, paint: Option<Rgba>) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    match paint {
        Some(c) => c.push_css(out),
        None => out.push_str("none"),
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(layer: usize, neuron: usize, cx: f64, cy: f64) -> Shape {
        Shape::Circle {
            cx,
            cy,
            r: 8.0,
            fill: Rgba::BLACK,
            node: NeuronHandle::new(layer, neuron),
        }
    }

    #[test]
    fn hit_test_finds_containing_node() {
        let mut s = Scene::new(100.0, 100.0);
        s.push(node(0, 0, 20.0, 20.0));
        s.push(node(0, 1, 20.0, 50.0));
        assert_eq!(s.node_at(25.0, 22.0), Some(NeuronHandle::new(0, 0)));
        assert_eq!(s.node_at(20.0, 58.0), Some(NeuronHandle::new(0, 1)));
        assert_eq!(s.node_at(20.0, 35.0), None);
    }

    #[test]
    fn hit_test_prefers_topmost() {
        let mut s = Scene::new(100.0, 100.0);
        s.push(node(0, 0, 20.0, 20.0));
        s.push(node(1, 0, 24.0, 20.0));
        assert_eq!(s.node_at(22.0, 20.0), Some(NeuronHandle::new(1, 0)));
    }

    #[test]
    fn stats_count_by_kind() {
        let mut s = Scene::new(10.0, 10.0);
        s.push(Shape::Rect {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
            fill: None,
            stroke: Some(Rgba::BLACK),
            stroke_width: 1.0,
        });
        s.push(Shape::Line {
            x1: 0.0,
            y1: 0.0,
            x2: 1.0,
            y2: 1.0,
            stroke: Rgba::RED,
            stroke_width: 0.5,
        });
        s.push(node(0, 0, 5.0, 5.0));
        let st = s.stats();
        assert_eq!((st.rects, st.lines, st.circles), (1, 1, 1));
        assert_eq!(st.total(), s.len());
        assert_eq!(s.node(NeuronHandle::new(0, 0)).map(|n| n.cx), Some(5.0));
    }

    #[test]
    fn svg_tags_nodes() {
        let mut s = Scene::new(120.0, 80.5);
        s.push(node(2, 3, 10.0, 12.25));
        let svg = s.to_svg();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"width="120" height="80.5""#));
        assert!(svg.contains(r#"cy="12.25""#));
        assert!(svg.contains(r#"data-layer="2" data-neuron="3""#));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn svg_writes_none_for_missing_paint() {
        let mut s = Scene::new(10.0, 10.0);
        s.push(Shape::Rect {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
            fill: None,
            stroke: Some(Rgba::BLACK),
            stroke_width: 2.0,
        });
        assert!(s.to_svg().contains(r#"fill="none" stroke="rgba(0, 0, 0, 1.000)" stroke-width="2""#));
    }
}
