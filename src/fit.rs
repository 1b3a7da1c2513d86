//! Least-squares control-point fitting for curves and surfaces.
//!
//! Each fit assembles a design matrix with one row per data point and the
//! active basis values as its only nonzero entries, then solves the
//! minimum-norm least-squares problem through [`crate::faer_ndarray::lstsq`].
//! Ill-conditioning is surfaced through the reported residual, never as an
//! error; the design matrix is call-local and dropped after the solve.

use crate::basis::{
    BasisError, BasisScratch, basis_funs_into, find_span, num_control_points, validate_knots,
};
use crate::faer_ndarray::{FaerLinalgError, lstsq};
use crate::parameterize::ParameterizeError;
use ndarray::{Array1, Array2, ArrayView1};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FitError {
    #[error("Data arrays have mismatched lengths: {0}")]
    DimensionMismatch(String),

    #[error("No data points were provided.")]
    EmptyInput,

    #[error(transparent)]
    Basis(#[from] BasisError),

    #[error(transparent)]
    Parameterize(#[from] ParameterizeError),

    #[error("Least-squares solve failed: {0}")]
    Linalg(#[from] FaerLinalgError),
}

/// Result of a single-coordinate curve fit.
#[derive(Clone, Debug)]
pub struct CurveFit {
    /// Fitted control points, one per basis function of the knot vector.
    pub ctrl: Array1<f64>,
    /// Residual norm `||A p - b||` of the least-squares solve.
    pub residual: f64,
}

/// Result of fitting x(s) and y(s) independently over shared knots.
#[derive(Clone, Debug)]
pub struct CurveFitXY {
    pub ctrl_x: Array1<f64>,
    pub ctrl_y: Array1<f64>,
    pub residual_x: f64,
    pub residual_y: f64,
}

impl CurveFitXY {
    /// Combined Euclidean residual over both coordinates.
    pub fn residual(&self) -> f64 {
        (self.residual_x * self.residual_x + self.residual_y * self.residual_y).sqrt()
    }
}

/// Result of a tensor-product surface fit.
#[derive(Clone, Debug)]
pub struct SurfaceFit {
    /// Fitted control grid, indexed `[v_index, u_index]`.
    pub ctrl: Array2<f64>,
    pub residual: f64,
}

/// Design-matrix column owning the basis value with local index `r` over
/// `span`.
///
/// Requires `degree <= span` and `r <= degree`; the result lies in
/// `span - degree ..= span`, which [`find_span`] keeps inside
/// `0 .. num_ctrl`.
#[inline]
fn curve_column(span: usize, degree: usize, r: usize) -> usize {
    debug_assert!(span >= degree && r <= degree);
    span - degree + r
}

/// Flattened design-matrix column for control-grid entry
/// `(col_u, col_v)`.
///
/// Requires `col_u < num_ctrl_u`; the flattened index matches a row-major
/// `(num_ctrl_v, num_ctrl_u)` control grid.
#[inline]
fn surface_column(col_u: usize, col_v: usize, num_ctrl_u: usize) -> usize {
    debug_assert!(col_u < num_ctrl_u);
    col_v * num_ctrl_u + col_u
}

fn check_point_count(n_points: usize, n_ctrl: usize, what: &str) {
    if n_points < n_ctrl {
        log::warn!(
            "{what} fit is under-determined: {n_points} points for {n_ctrl} control points; \
             the minimum-norm solution will interpolate rather than smooth"
        );
    }
}

/// Assembles the `(n_points, n_ctrl)` curve design matrix: row `i` carries the
/// `degree + 1` basis values of `params[i]`, all other entries zero.
fn curve_design_matrix(
    params: ArrayView1<'_, f64>,
    knots: ArrayView1<'_, f64>,
    degree: usize,
) -> Array2<f64> {
    let n_ctrl = num_control_points(knots, degree);
    let mut design = Array2::<f64>::zeros((params.len(), n_ctrl));
    let mut values = vec![0.0; degree + 1];
    let mut scratch = BasisScratch::new(degree);

    for (i, &s) in params.iter().enumerate() {
        let span = find_span(n_ctrl, degree, s, knots);
        basis_funs_into(span, s, degree, knots, &mut values, &mut scratch);
        for (r, &weight) in values.iter().enumerate() {
            design[[i, curve_column(span, degree, r)]] = weight;
        }
    }
    design
}

/// Least-squares fit of a single coordinate against parameter values.
///
/// Solves `A p = values` for the control points `p` minimizing the residual,
/// where `A` is the basis design matrix of `params` over `knots`. The system
/// should be over-determined (`n_points >= n_ctrl`) for a smoothing fit;
/// under-determined systems still return the minimum-norm interpolant.
pub fn fit_curve(
    params: ArrayView1<'_, f64>,
    values: ArrayView1<'_, f64>,
    knots: ArrayView1<'_, f64>,
    degree: usize,
) -> Result<CurveFit, FitError> {
    validate_knots(knots, degree)?;
    if params.len() != values.len() {
        return Err(FitError::DimensionMismatch(format!(
            "{} parameters vs {} values",
            params.len(),
            values.len()
        )));
    }
    if params.is_empty() {
        return Err(FitError::EmptyInput);
    }
    check_point_count(params.len(), num_control_points(knots, degree), "curve");

    let design = curve_design_matrix(params, knots, degree);
    let solved = lstsq(&design, values)?;
    Ok(CurveFit {
        ctrl: solved.solution,
        residual: solved.residual,
    })
}

/// Fits x(s) and y(s) independently with shared knots and parameters.
///
/// The two coordinates do not interact: this is two calls to [`fit_curve`]
/// sharing one design-matrix structure, returning a control polygon per
/// coordinate and a residual per coordinate.
pub fn fit_curve_xy(
    s: ArrayView1<'_, f64>,
    x: ArrayView1<'_, f64>,
    y: ArrayView1<'_, f64>,
    knots: ArrayView1<'_, f64>,
    degree: usize,
) -> Result<CurveFitXY, FitError> {
    if x.len() != y.len() {
        return Err(FitError::DimensionMismatch(format!(
            "{} x values vs {} y values",
            x.len(),
            y.len()
        )));
    }
    let fit_x = fit_curve(s, x, knots, degree)?;
    let fit_y = fit_curve(s, y, knots, degree)?;
    Ok(CurveFitXY {
        ctrl_x: fit_x.ctrl,
        ctrl_y: fit_y.ctrl,
        residual_x: fit_x.residual,
        residual_y: fit_y.residual,
    })
}

/// Least-squares fit of a tensor-product surface `z(u, v)`.
///
/// Each scattered point contributes one row with up to `(degree + 1)^2`
/// nonzero entries at the flattened columns of its active control block. The
/// design matrix is `(n_points, ncu * ncv)`; its memory footprint is the
/// dominant cost for fine knot vectors and is the caller's budget to manage.
/// The solved control grid is returned in `(ncv, ncu)` shape.
pub fn fit_surface(
    u: ArrayView1<'_, f64>,
    v: ArrayView1<'_, f64>,
    z: ArrayView1<'_, f64>,
    knots_u: ArrayView1<'_, f64>,
    knots_v: ArrayView1<'_, f64>,
    degree: usize,
) -> Result<SurfaceFit, FitError> {
    validate_knots(knots_u, degree)?;
    validate_knots(knots_v, degree)?;
    if u.len() != v.len() || u.len() != z.len() {
        return Err(FitError::DimensionMismatch(format!(
            "{} u values vs {} v values vs {} z values",
            u.len(),
            v.len(),
            z.len()
        )));
    }
    if u.is_empty() {
        return Err(FitError::EmptyInput);
    }

    let num_ctrl_u = num_control_points(knots_u, degree);
    let num_ctrl_v = num_control_points(knots_v, degree);
    check_point_count(u.len(), num_ctrl_u * num_ctrl_v, "surface");

    let mut design = Array2::<f64>::zeros((u.len(), num_ctrl_u * num_ctrl_v));
    let mut values_u = vec![0.0; degree + 1];
    let mut values_v = vec![0.0; degree + 1];
    let mut scratch = BasisScratch::new(degree);

    for i in 0..u.len() {
        let span_u = find_span(num_ctrl_u, degree, u[i], knots_u);
        let span_v = find_span(num_ctrl_v, degree, v[i], knots_v);
        basis_funs_into(span_u, u[i], degree, knots_u, &mut values_u, &mut scratch);
        basis_funs_into(span_v, v[i], degree, knots_v, &mut values_v, &mut scratch);

        for (k, &wu) in values_u.iter().enumerate() {
            for (l, &wv) in values_v.iter().enumerate() {
                let col = surface_column(
                    curve_column(span_u, degree, k),
                    curve_column(span_v, degree, l),
                    num_ctrl_u,
                );
                design[[i, col]] = wu * wv;
            }
        }
    }

    let solved = lstsq(&design, z)?;
    let ctrl = Array2::from_shape_vec((num_ctrl_v, num_ctrl_u), solved.solution.to_vec())
        .map_err(|e| FitError::DimensionMismatch(e.to_string()))?;
    Ok(SurfaceFit {
        ctrl,
        residual: solved.residual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::uniform_knots;
    use crate::evaluate::{curve_point, surface_point};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn straight_line_fits_to_machine_precision() {
        let degree = 3;
        let knots = uniform_knots(3, degree, (0.0, 1.0)).unwrap();
        let s = Array1::linspace(0.0, 1.0, 30);
        let y = s.mapv(|t| 2.0 * t - 0.5);

        let fit = fit_curve(s.view(), y.view(), knots.view(), degree).unwrap();
        assert!(fit.residual < 1e-8, "residual {}", fit.residual);
        for &t in &[0.0, 0.21, 0.5, 0.83, 1.0] {
            assert_abs_diff_eq!(
                curve_point(degree, knots.view(), fit.ctrl.view(), t),
                2.0 * t - 0.5,
                epsilon = 1e-8
            );
        }
    }

    #[test]
    fn four_point_line_reproduces_its_endpoints() {
        let degree = 3;
        let knots = uniform_knots(2, degree, (0.0, 1.0)).unwrap();
        let s = array![0.0, 0.33, 0.67, 1.0];
        let x = array![0.0, 1.0, 2.0, 3.0];
        let y = array![0.0, 1.0, 2.0, 3.0];

        let fit = fit_curve_xy(s.view(), x.view(), y.view(), knots.view(), degree).unwrap();
        assert!(fit.residual() < 1e-8, "residual {}", fit.residual());

        let x0 = curve_point(degree, knots.view(), fit.ctrl_x.view(), 0.0);
        let y0 = curve_point(degree, knots.view(), fit.ctrl_y.view(), 0.0);
        let x1 = curve_point(degree, knots.view(), fit.ctrl_x.view(), 1.0);
        let y1 = curve_point(degree, knots.view(), fit.ctrl_y.view(), 1.0);
        assert_abs_diff_eq!(x0, 0.0, epsilon = 1e-8);
        assert_abs_diff_eq!(y0, 0.0, epsilon = 1e-8);
        assert_abs_diff_eq!(x1, 3.0, epsilon = 1e-8);
        assert_abs_diff_eq!(y1, 3.0, epsilon = 1e-8);
    }

    #[test]
    fn planar_surface_fits_with_near_zero_residual() {
        let degree = 1;
        let knots = uniform_knots(1, degree, (0.0, 1.0)).unwrap();
        let grid = Array1::linspace(0.0, 1.0, 6);

        let n = grid.len() * grid.len();
        let mut u = Array1::<f64>::zeros(n);
        let mut v = Array1::<f64>::zeros(n);
        let mut z = Array1::<f64>::zeros(n);
        let mut row = 0;
        for &ui in grid.iter() {
            for &vi in grid.iter() {
                u[row] = ui;
                v[row] = vi;
                z[row] = ui + vi;
                row += 1;
            }
        }

        let fit = fit_surface(
            u.view(),
            v.view(),
            z.view(),
            knots.view(),
            knots.view(),
            degree,
        )
        .unwrap();
        assert!(fit.residual < 1e-8, "residual {}", fit.residual);

        for &(ui, vi) in &[(0.0, 0.0), (1.0, 1.0), (0.3, 0.8), (0.75, 0.25)] {
            assert_abs_diff_eq!(
                surface_point(degree, knots.view(), knots.view(), fit.ctrl.view(), ui, vi),
                ui + vi,
                epsilon = 1e-8
            );
        }
    }

    #[test]
    fn cubic_surface_fit_recovers_a_smooth_function() {
        let degree = 3;
        let knots = uniform_knots(2, degree, (0.0, 1.0)).unwrap();
        let grid = Array1::linspace(0.0, 1.0, 12);

        let n = grid.len() * grid.len();
        let mut u = Array1::<f64>::zeros(n);
        let mut v = Array1::<f64>::zeros(n);
        let mut z = Array1::<f64>::zeros(n);
        let mut row = 0;
        for &ui in grid.iter() {
            for &vi in grid.iter() {
                u[row] = ui;
                v[row] = vi;
                // Cubic in each direction, representable exactly.
                z[row] = ui * ui * ui - 2.0 * vi * vi + ui * vi;
                row += 1;
            }
        }

        let fit = fit_surface(
            u.view(),
            v.view(),
            z.view(),
            knots.view(),
            knots.view(),
            degree,
        )
        .unwrap();
        assert!(fit.residual < 1e-7, "residual {}", fit.residual);
    }

    #[test]
    fn mismatched_inputs_are_rejected() {
        let degree = 3;
        let knots = uniform_knots(2, degree, (0.0, 1.0)).unwrap();
        let s = array![0.0, 0.5, 1.0];
        let y = array![0.0, 0.5];
        assert!(matches!(
            fit_curve(s.view(), y.view(), knots.view(), degree),
            Err(FitError::DimensionMismatch(_))
        ));

        let empty = Array1::<f64>::zeros(0);
        assert!(matches!(
            fit_curve(empty.view(), empty.view(), knots.view(), degree),
            Err(FitError::EmptyInput)
        ));
    }

    #[test]
    fn invalid_knot_vectors_are_rejected() {
        let s = array![0.0, 0.5, 1.0];
        let decreasing = array![0.0, 0.0, 0.0, 0.0, 0.7, 0.3, 1.0, 1.0, 1.0, 1.0];
        assert!(matches!(
            fit_curve(s.view(), s.view(), decreasing.view(), 3),
            Err(FitError::Basis(_))
        ));
    }
}
