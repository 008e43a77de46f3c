//! Diverging weight-to-color mapping.
//!
//! Positive weights are blue, non-positive weights are red, and the alpha
//! channel carries the magnitude: `alpha = min(1, |w| * 4)`, so any weight with
//! `|w| >= 0.25` is fully opaque.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::float_fmt::push_f64_fixed;
use crate::tensor::Weight;

/// Magnitude at which a weight reaches full opacity.
pub const SATURATION_WEIGHT: f32 = 0.25;

/// An sRGB color with a straight (non-premultiplied) alpha in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const BLUE: Rgba = Rgba::opaque(0, 0, 255);
    pub const RED: Rgba = Rgba::opaque(255, 0, 0);
    pub const BLACK: Rgba = Rgba::opaque(0, 0, 0);
    /// CSS `lightgray`.
    pub const LIGHT_GRAY: Rgba = Rgba::opaque(211, 211, 211);

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        let a = if a.is_nan() { 0.0 } else { a.clamp(0.0, 1.0) };
        Self { a, ..self }
    }

    /// CSS color string, e.g. `rgba(0, 0, 255, 0.500)`.
    pub fn css(&self) -> String {
        let mut out = String::with_capacity(24);
        self.push_css(&mut out);
        out
    }

    pub(crate) fn push_css(&self, out: &mut String) {
        out.push_str("rgba(");
        out.push_str(&self.r.to_string());
        out.push_str(", ");
        out.push_str(&self.g.to_string());
        out.push_str(", ");
        out.push_str(&self.b.to_string());
        out.push_str(", ");
        push_f64_fixed(out, self.a as f64, 3, false);
        out.push(')');
    }
}

impl core::fmt::Display for Rgba {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.css())
    }
}

/// Opacity for a weight: `min(1, |w| / SATURATION_WEIGHT)`, i.e. `|w| * 4`.
///
/// Total over all `f32`: NaN counts as zero and infinities saturate.
#[inline]
pub fn intensity(weight: Weight) -> f32 {
    if weight.is_nan() {
        return 0.0;
    }
    (weight.abs() / SATURATION_WEIGHT).min(1.0)
}

/// Map a weight to its display color.
///
/// Ties go to the non-positive branch, so `color_for(0.0)` is fully
/// transparent red.
#[inline]
pub fn color_for(weight: Weight) -> Rgba {
    let alpha = intensity(weight);
    if weight > 0.0 {
        Rgba::BLUE.with_alpha(alpha)
    } else {
        Rgba::RED.with_alpha(alpha)
    }
}

/// Colors for every cell of a receptive field, in the same row-major order.
pub fn color_grid(values: &[f32]) -> Vec<Rgba> {
    values.iter().copied().map(color_for).collect()
}
