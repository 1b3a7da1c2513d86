//! Legacy fixed-degree-3 uniform B-spline helpers.
//!
//! Independent of the general-degree engine in [`crate::basis`]: the basis
//! here is the closed-form uniform cubic (a constant coefficient matrix, no
//! knot vector), control points live on an integer index grid, and values are
//! assigned point-wise through a minimum-norm single-constraint solve rather
//! than a global least-squares fit. It trades generality for simplicity and
//! is not interchangeable with the knot-based machinery.

use ndarray::{Array1, ArrayView1};

/// Uniform cubic B-spline coefficient matrix, scaled by 6.
///
/// `weights(t) = [t^3, t^2, t, 1] * M / 6` gives the four basis values over
/// one segment; dotting them with four consecutive control points evaluates
/// the curve.
const COEFF_MATRIX: [[f64; 4]; 4] = [
    [-1.0, 3.0, -3.0, 1.0],
    [3.0, -6.0, 3.0, 0.0],
    [-3.0, 0.0, 3.0, 0.0],
    [1.0, 4.0, 1.0, 0.0],
];

/// Normalization constants captured by [`normalize`], needed to undo it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormConstants {
    pub min: f64,
    pub max: f64,
}

/// Evaluates the four uniform cubic basis functions at `t`, `0 <= t <= 1`.
///
/// The values are non-negative and sum to 1 for any `t` in the unit
/// interval (C^2-continuous partition of unity).
pub fn cubic_weights(t: f64) -> [f64; 4] {
    let monomials = [t * t * t, t * t, t, 1.0];
    let mut out = [0.0; 4];
    for (col, slot) in out.iter_mut().enumerate() {
        let mut acc = 0.0;
        for (row, &m) in monomials.iter().enumerate() {
            acc += m * COEFF_MATRIX[row][col];
        }
        *slot = acc / 6.0;
    }
    out
}

/// Maps points into control-point index space `[0, n]`, where `n + 1` is the
/// number of control points.
///
/// A zero-width input range substitutes a denominator of 1, collapsing all
/// points to 0 instead of dividing by zero.
pub fn normalize(pts: ArrayView1<'_, f64>, n: usize) -> (Array1<f64>, NormConstants) {
    let min = pts.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = pts.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mut denom = max - min;
    if denom.abs() <= 1e-12 {
        denom = 1.0;
    }
    let out = pts.mapv(|p| n as f64 * (p - min) / denom);
    (out, NormConstants { min, max })
}

/// Restores points normalized by [`normalize`] to their original range.
pub fn denormalize(npts: ArrayView1<'_, f64>, nc: NormConstants, n: usize) -> Array1<f64> {
    npts.mapv(|p| p * (nc.max - nc.min) / n as f64 + nc.min)
}

/// Lowest control index influencing the normalized parameter `t`.
///
/// May be negative at the left boundary (`t < 1`); callers clamp to the
/// valid grid.
#[inline]
pub fn lower(t: f64) -> i64 {
    t.floor() as i64 - 1
}

/// Highest control index influencing the normalized parameter `t`.
///
/// `upper(t) - lower(t) == 3` for every `t`: a cubic segment always touches
/// exactly four control points.
#[inline]
pub fn upper(t: f64) -> i64 {
    t.floor() as i64 + 2
}

/// The four control indices influencing `t`, in increasing order:
/// `floor(t) - 1 ..= floor(t) + 2`.
#[inline]
pub fn support_indices(t: f64) -> [i64; 4] {
    let lo = lower(t);
    [lo, lo + 1, lo + 2, lo + 3]
}

/// Samples the curve defined by `ctrl` on a regular grid of
/// `samples_per_segment` parameters per interior segment.
///
/// Returns `(x, y)` where `x` covers `[0, ctrl.len() - 3]` in segment-index
/// coordinates. Requires at least four control points.
pub fn eval(ctrl: ArrayView1<'_, f64>, samples_per_segment: usize) -> (Array1<f64>, Array1<f64>) {
    let segments = ctrl.len().saturating_sub(3);
    let total = segments * samples_per_segment;
    let mut x = Array1::<f64>::zeros(total);
    let mut y = Array1::<f64>::zeros(total);

    let mut k = 0;
    for seg in 1..=segments {
        for s in 0..samples_per_segment {
            let t = if samples_per_segment > 1 {
                s as f64 / (samples_per_segment - 1) as f64
            } else {
                0.0
            };
            let w = cubic_weights(t);
            let mut q = 0.0;
            for (a, &weight) in w.iter().enumerate() {
                q += weight * ctrl[seg - 1 + a];
            }
            x[k] = seg as f64 + t - 1.0;
            y[k] = q;
            k += 1;
        }
    }
    (x, y)
}

/// Basis weights of the segment containing the normalized coordinate `xc`.
fn eval_basis(xc: f64) -> [f64; 4] {
    cubic_weights(xc - xc.floor())
}

/// Assigns a value to the control points around `xc` so the curve passes
/// through `(xc, yc)`.
///
/// Solves `min ||P||^2 subject to sum_a w_a * P_a = yc`, whose closed form is
/// `P_a = w_a * yc / sum(w^2)` — a minimum-norm solution to one interpolation
/// constraint, not a least-squares fit. Returns the four control values and
/// the indices they belong to (see [`support_indices`]).
pub fn set_ctrlpt(xc: f64, yc: f64) -> ([f64; 4], [i64; 4]) {
    let w = eval_basis(xc);
    let norm2: f64 = w.iter().map(|&a| a * a).sum();
    let mut values = [0.0; 4];
    for (slot, &weight) in values.iter_mut().zip(w.iter()) {
        *slot = weight * yc / norm2;
    }
    (values, support_indices(xc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn weights_match_the_closed_form_at_segment_ends() {
        let at_zero = cubic_weights(0.0);
        let expected0 = [1.0 / 6.0, 4.0 / 6.0, 1.0 / 6.0, 0.0];
        for (got, want) in at_zero.iter().zip(expected0.iter()) {
            assert_abs_diff_eq!(*got, *want, epsilon = 1e-12);
        }

        let at_one = cubic_weights(1.0);
        let expected1 = [0.0, 1.0 / 6.0, 4.0 / 6.0, 1.0 / 6.0];
        for (got, want) in at_one.iter().zip(expected1.iter()) {
            assert_abs_diff_eq!(*got, *want, epsilon = 1e-12);
        }
    }

    #[test]
    fn weights_are_a_nonnegative_partition_of_unity() {
        for i in 0..=50 {
            let t = i as f64 / 50.0;
            let w = cubic_weights(t);
            assert_abs_diff_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
            assert!(w.iter().all(|&v| v >= 0.0));
        }
    }

    #[test]
    fn normalize_round_trips_through_denormalize() {
        let pts = array![-3.0, 1.5, 0.0, 7.25, 4.0];
        let n = 9;
        let (npts, nc) = normalize(pts.view(), n);

        assert_abs_diff_eq!(npts.iter().cloned().fold(f64::INFINITY, f64::min), 0.0);
        assert_abs_diff_eq!(
            npts.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            n as f64
        );

        let restored = denormalize(npts.view(), nc, n);
        assert_abs_diff_eq!(
            restored.as_slice().unwrap(),
            pts.as_slice().unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn normalize_collapses_a_degenerate_range() {
        let pts = array![5.0, 5.0, 5.0];
        let (npts, _nc) = normalize(pts.view(), 4);
        assert!(npts.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn support_offsets_follow_the_fixed_pattern() {
        assert_eq!(lower(2.3), 1);
        assert_eq!(upper(2.3), 4);
        assert_eq!(support_indices(2.3), [1, 2, 3, 4]);

        // Left boundary: the window may reach outside the grid.
        assert_eq!(lower(0.5), -1);
        assert_eq!(support_indices(0.5), [-1, 0, 1, 2]);

        for i in 0..=40 {
            let t = i as f64 / 4.0;
            assert_eq!(upper(t) - lower(t), 3);
        }
    }

    #[test]
    fn eval_of_a_constant_polygon_is_constant() {
        let ctrl = array![2.0, 2.0, 2.0, 2.0, 2.0, 2.0];
        let (x, y) = eval(ctrl.view(), 10);
        assert_eq!(x.len(), (ctrl.len() - 3) * 10);
        assert!(y.iter().all(|&v| (v - 2.0).abs() < 1e-12));
        assert_abs_diff_eq!(x[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x[x.len() - 1], (ctrl.len() - 3) as f64, epsilon = 1e-12);
    }

    #[test]
    fn set_ctrlpt_satisfies_its_interpolation_constraint() {
        for &(xc, yc) in &[(2.4, 3.0), (5.0, -1.5), (0.7, 0.25)] {
            let (values, indices) = set_ctrlpt(xc, yc);
            let w = cubic_weights(xc - xc.floor());
            let reproduced: f64 = w.iter().zip(values.iter()).map(|(&a, &p)| a * p).sum();
            assert_abs_diff_eq!(reproduced, yc, epsilon = 1e-12);
            assert_eq!(indices[3] - indices[0], 3);
        }
    }
}
