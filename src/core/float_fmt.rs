//! Float formatting helpers for CSS colors and SVG attributes.
//!
//! Rust's core float-to-decimal formatting has had wasm-facing panics in some
//! toolchain/browser combinations (see `dragon.rs` panics). The browser host
//! formats every color string through here, so these helpers do **not** use
//! `format!` on floats.
//!
//! They:
//! - Map `NaN` to `0` and `±Inf` to the largest representable magnitude; a
//!   color or coordinate string must always stay parseable.
//! - For finite values, scale + round into an `i64`, then format integers.

/// Format with exactly `decimals` fractional digits.
#[inline]
pub fn fmt_f64_fixed(v: f64, decimals: usize) -> String {
    let mut out = String::new();
    push_f64_fixed(&mut out, v, decimals, false);
    out
}

/// Append `v` with `decimals` fractional digits. With `trim`, trailing zeros
/// (and a bare `.`) are dropped: `12.50` becomes `12.5`, `3.00` becomes `3`.
pub(crate) fn push_f64_fixed(out: &mut String, v: f64, decimals: usize, trim: bool) {
    let v = if v.is_nan() {
        0.0
    } else if v.is_infinite() {
        if v.is_sign_positive() {
            i64::MAX as f64
        } else {
            i64::MIN as f64
        }
    } else {
        v
    };

    // Clamp decimals to something reasonable to avoid huge powers.
    let decimals = decimals.min(9);

    let scale_i64 = 10_i64.checked_pow(decimals as u32).unwrap_or(1_i64);
    let scale_f = scale_i64 as f64;

    // Scale + round into an integer, saturating out-of-range values.
    let scaled = (v * scale_f).round();
    let scaled_i = if scaled >= i64::MAX as f64 {
        i64::MAX
    } else if scaled <= -(i64::MAX as f64) {
        -i64::MAX
    } else {
        scaled as i64
    };

    let negative = scaled_i < 0;
    let abs_i = scaled_i.unsigned_abs();
    let scale_u = scale_i64 as u64;
    let int_part = abs_i / scale_u;
    let mut frac_part = abs_i % scale_u;

    if negative {
        out.push('-');
    }
    out.push_str(&int_part.to_string());

    if decimals == 0 {
        return;
    }

    let mut digits = decimals;
    if trim {
        while digits > 0 && frac_part % 10 == 0 {
            frac_part /= 10;
            digits -= 1;
        }
        if digits == 0 {
            return;
        }
    }

    out.push('.');
    let frac_str = frac_part.to_string();
    for _ in 0..digits.saturating_sub(frac_str.len()) {
        out.push('0');
    }
    out.push_str(&frac_str);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trimmed(v: f64, decimals: usize) -> String {
        let mut out = String::new();
        push_f64_fixed(&mut out, v, decimals, true);
        out
    }

    #[test]
    fn fixed_pads_fraction() {
        assert_eq!(fmt_f64_fixed(0.5, 3), "0.500");
        assert_eq!(fmt_f64_fixed(-1.25, 1), "-1.3");
        assert_eq!(fmt_f64_fixed(1.0, 0), "1");
        assert_eq!(fmt_f64_fixed(0.05, 2), "0.05");
    }

    #[test]
    fn trimmed_drops_trailing_zeros() {
        assert_eq!(trimmed(12.5, 2), "12.5");
        assert_eq!(trimmed(3.0, 2), "3");
        assert_eq!(trimmed(-0.25, 2), "-0.25");
        assert_eq!(trimmed(0.0, 2), "0");
    }

    #[test]
    fn non_finite_values_stay_parseable() {
        assert_eq!(fmt_f64_fixed(f64::NAN, 2), "0.00");
        let inf = trimmed(f64::INFINITY, 1);
        assert!(inf.parse::<f64>().is_ok());
        assert!(!trimmed(f64::NEG_INFINITY, 1).contains("inf"));
    }
}
