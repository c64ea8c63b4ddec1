//! Min-max normalization.

pub fn clamp01(x: f64) -> f64 {
    if x < 0.0 {
        0.0
    } else if x > 1.0 {
        1.0
    } else {
        x
    }
}

/// Map `v` into [0, 1] against `(min, max)`.
///
/// Non-finite inputs and degenerate ranges (`max <= min`, which includes an
/// unobserved `(+inf, -inf)` range) yield 0.
pub fn norm(v: f64, min: f64, max: f64) -> f64 {
    if !v.is_finite() || !min.is_finite() || !max.is_finite() {
        return 0.0;
    }
    if max <= min {
        return 0.0;
    }
    // Spans near f64::MAX overflow to inf/inf.
    let ratio = (v - min) / (max - min);
    if ratio.is_nan() {
        return 0.0;
    }
    clamp01(ratio)
}
