//! Curve and surface point evaluation from control points and knot vectors.
//!
//! Evaluation combines precomputed Cox-de Boor basis weights with the active
//! control points directly (no corner-cutting); numerically adequate for the
//! low degrees (<= 5) this crate targets.

use crate::basis::{BasisScratch, basis_funs_into, find_span, num_control_points};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Evaluates a 1D-control-point B-spline curve at parameter `u`.
///
/// `ctrl` must hold exactly `knots.len() - degree - 1` control points; `u`
/// must lie in the domain covered by the knot vector.
pub fn curve_point(
    degree: usize,
    knots: ArrayView1<'_, f64>,
    ctrl: ArrayView1<'_, f64>,
    u: f64,
) -> f64 {
    let mut values = vec![0.0; degree + 1];
    let mut scratch = BasisScratch::new(degree);
    curve_point_with_scratch(degree, knots, ctrl, u, &mut values, &mut scratch)
}

fn curve_point_with_scratch(
    degree: usize,
    knots: ArrayView1<'_, f64>,
    ctrl: ArrayView1<'_, f64>,
    u: f64,
    values: &mut [f64],
    scratch: &mut BasisScratch,
) -> f64 {
    debug_assert_eq!(ctrl.len(), num_control_points(knots, degree));
    let span = find_span(ctrl.len(), degree, u, knots);
    basis_funs_into(span, u, degree, knots, values, scratch);

    let mut point = 0.0;
    for (i, &weight) in values.iter().enumerate() {
        point += weight * ctrl[span - degree + i];
    }
    point
}

/// Evaluates a tensor-product B-spline surface at `(u, v)`.
///
/// The control grid is indexed `[v_index, u_index]`: rows follow the `v`
/// parametric direction, columns follow `u`. Shape must be
/// `(knots_v.len() - degree - 1, knots_u.len() - degree - 1)`.
pub fn surface_point(
    degree: usize,
    knots_u: ArrayView1<'_, f64>,
    knots_v: ArrayView1<'_, f64>,
    ctrl: ArrayView2<'_, f64>,
    u: f64,
    v: f64,
) -> f64 {
    let mut values_u = vec![0.0; degree + 1];
    let mut values_v = vec![0.0; degree + 1];
    let mut scratch = BasisScratch::new(degree);
    surface_point_with_scratch(
        degree,
        knots_u,
        knots_v,
        ctrl,
        u,
        v,
        &mut values_u,
        &mut values_v,
        &mut scratch,
    )
}

#[allow(clippy::too_many_arguments)]
fn surface_point_with_scratch(
    degree: usize,
    knots_u: ArrayView1<'_, f64>,
    knots_v: ArrayView1<'_, f64>,
    ctrl: ArrayView2<'_, f64>,
    u: f64,
    v: f64,
    values_u: &mut [f64],
    values_v: &mut [f64],
    scratch: &mut BasisScratch,
) -> f64 {
    let num_ctrl_u = num_control_points(knots_u, degree);
    let num_ctrl_v = num_control_points(knots_v, degree);
    debug_assert_eq!(ctrl.dim(), (num_ctrl_v, num_ctrl_u));

    let span_u = find_span(num_ctrl_u, degree, u, knots_u);
    let span_v = find_span(num_ctrl_v, degree, v, knots_v);
    basis_funs_into(span_u, u, degree, knots_u, values_u, scratch);
    basis_funs_into(span_v, v, degree, knots_v, values_v, scratch);

    let mut point = 0.0;
    for (i, &wu) in values_u.iter().enumerate() {
        for (j, &wv) in values_v.iter().enumerate() {
            point += wu * wv * ctrl[[span_v - degree + j, span_u - degree + i]];
        }
    }
    point
}

/// Evaluates a curve over a whole parameter sequence.
pub fn eval_curve(
    degree: usize,
    knots: ArrayView1<'_, f64>,
    ctrl: ArrayView1<'_, f64>,
    params: ArrayView1<'_, f64>,
) -> Array1<f64> {
    let mut values = vec![0.0; degree + 1];
    let mut scratch = BasisScratch::new(degree);
    let mut out = Array1::<f64>::zeros(params.len());
    for (k, &u) in params.iter().enumerate() {
        out[k] = curve_point_with_scratch(degree, knots, ctrl, u, &mut values, &mut scratch);
    }
    out
}

/// Evaluates a surface over the Cartesian grid of two parameter sequences,
/// returning a `(params_u.len(), params_v.len())` grid.
pub fn eval_surface(
    degree: usize,
    knots_u: ArrayView1<'_, f64>,
    knots_v: ArrayView1<'_, f64>,
    ctrl: ArrayView2<'_, f64>,
    params_u: ArrayView1<'_, f64>,
    params_v: ArrayView1<'_, f64>,
) -> Array2<f64> {
    let mut values_u = vec![0.0; degree + 1];
    let mut values_v = vec![0.0; degree + 1];
    let mut scratch = BasisScratch::new(degree);
    let mut out = Array2::<f64>::zeros((params_u.len(), params_v.len()));
    for (i, &u) in params_u.iter().enumerate() {
        for (j, &v) in params_v.iter().enumerate() {
            out[[i, j]] = surface_point_with_scratch(
                degree,
                knots_u,
                knots_v,
                ctrl,
                u,
                v,
                &mut values_u,
                &mut values_v,
                &mut scratch,
            );
        }
    }
    out
}
