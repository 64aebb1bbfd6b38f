//! Scalar kernels shared by every adaptive power unit.
//!
//! A unit with maximum power `P` expands a shifted input `u = x + s` into `u^1..=u^P`.

/// Writes the powers `u^1..=u^P` into `out`, where `P = out.len()`.
pub fn expand(u: f32, out: &mut [f32]) {
    let mut acc = 1.;

    for v in out.iter_mut() {
        acc *= u;
        *v = acc;
    }
}

/// Evaluates `sum_p w[p] * u^(p+1)`.
pub fn eval(w: &[f32], u: f32) -> f32 {
    let mut acc = 1.;
    let mut y = 0.;

    for &wp in w {
        acc *= u;
        y += wp * acc;
    }

    y
}

/// Evaluates the derivative of `eval` with respect to `u`, that is `sum_p (p+1) * w[p] * u^p`.
///
/// `u^0` is `1` even when `u` is zero.
pub fn slope(w: &[f32], u: f32) -> f32 {
    let mut acc = 1.;
    let mut dy = 0.;

    for (p, &wp) in w.iter().enumerate() {
        dy += (p + 1) as f32 * wp * acc;
        acc *= u;
    }

    dy
}
