use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use netscope::scene::{Scene, Shape};

fn context_2d(
    canvas: &web_sys::HtmlCanvasElement,
) -> Result<web_sys::CanvasRenderingContext2d, String> {
    canvas
        .get_context("2d")
        .map_err(|_| "canvas: get_context threw".to_string())?
        .ok_or("canvas: missing 2d context".to_string())?
        .dyn_into::<web_sys::CanvasRenderingContext2d>()
        .map_err(|_| "canvas: context is not 2d".to_string())
}

/// Resize `canvas` to the scene and paint every shape in order.
#[allow(deprecated)]
pub(super) fn paint_scene(canvas: &web_sys::HtmlCanvasElement, scene: &Scene) -> Result<(), String> {
    let w = scene.width().ceil().max(1.0);
    let h = scene.height().ceil().max(1.0);
    canvas.set_width(w as u32);
    canvas.set_height(h as u32);

    let ctx = context_2d(canvas)?;
    ctx.clear_rect(0.0, 0.0, w, h);

    for shape in scene.shapes() {
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
                if let Some(fill) = fill {
                    ctx.set_fill_style(&JsValue::from_str(&fill.css()));
                    ctx.fill_rect(*x, *y, *width, *height);
                }
                if let Some(stroke) = stroke {
                    ctx.set_stroke_style(&JsValue::from_str(&stroke.css()));
                    ctx.set_line_width(*stroke_width);
                    ctx.stroke_rect(*x, *y, *width, *height);
                }
            }
            Shape::Line {
                x1,
                y1,
                x2,
                y2,
                stroke,
                stroke_width,
            } => {
                ctx.set_stroke_style(&JsValue::from_str(&stroke.css()));
                ctx.set_line_width(*stroke_width);
                ctx.begin_path();
                ctx.move_to(*x1, *y1);
                ctx.line_to(*x2, *y2);
                ctx.stroke();
            }
            Shape::Circle { cx, cy, r, fill, .. } => {
                ctx.set_fill_style(&JsValue::from_str(&fill.css()));
                ctx.begin_path();
                ctx.arc(*cx, *cy, *r, 0.0, std::f64::consts::PI * 2.0).ok();
                ctx.fill();
            }
        }
    }
    Ok(())
}

pub(super) fn clear_canvas(canvas: &web_sys::HtmlCanvasElement) -> Result<(), String> {
    let ctx = context_2d(canvas)?;
    ctx.clear_rect(0.0, 0.0, canvas.width() as f64, canvas.height() as f64);
    Ok(())
}
