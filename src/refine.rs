//! Adaptive knot refinement: re-fit with more knots until a residual target
//! is met or the knot budget runs out.

use crate::basis::{BasisError, KnotPlacement, uniform_knots};
use crate::fit::{FitError, fit_curve_xy};
use crate::parameterize::chord_lengths;
use ndarray::{Array1, ArrayView1};

/// Policy knobs for [`smooth_fit`].
#[derive(Clone, Copy, Debug)]
pub struct RefineOptions {
    /// Stop once the combined fit residual falls at or below this value.
    pub residual_target: f64,
    /// Interior-knot budget; the loop stops before reaching it.
    pub max_knots: usize,
    /// Interior knots added per iteration. This is a tuning parameter, not a
    /// contract; coarse steps trade fit quality for fewer solves.
    pub knot_step: usize,
    /// Spline degree for every fit in the loop.
    pub degree: usize,
    /// Interior knot placement strategy.
    pub placement: KnotPlacement,
}

impl Default for RefineOptions {
    fn default() -> Self {
        Self {
            residual_target: 0.1,
            max_knots: 100,
            knot_step: 2,
            degree: 3,
            placement: KnotPlacement::default(),
        }
    }
}

/// Per-iteration snapshot handed to the progress callback.
#[derive(Clone, Copy, Debug)]
pub struct RefineProgress {
    pub iteration: usize,
    pub num_knots: usize,
    pub residual: f64,
}

/// Result of an adaptive refinement run.
///
/// `converged` records whether the residual target was met; an exhausted knot
/// budget is a best-effort result, not an error, so callers must check
/// `residual` (or `converged`) against their tolerance themselves.
#[derive(Clone, Debug)]
pub struct SmoothFit {
    pub ctrl_x: Array1<f64>,
    pub ctrl_y: Array1<f64>,
    pub knots: Array1<f64>,
    /// Chord-length parameter of each input point.
    pub params: Array1<f64>,
    /// Combined Euclidean residual of the final fit.
    pub residual: f64,
    pub converged: bool,
}

/// Builds the iteration's knot vector, degrading clustered placement to
/// uniform when the sample count can no longer support the requested center
/// count (k-means needs at least one sample per center).
fn build_refined_knots(
    placement: KnotPlacement,
    samples: ArrayView1<'_, f64>,
    num_internal: usize,
    degree: usize,
) -> Result<Array1<f64>, BasisError> {
    if matches!(placement, KnotPlacement::Clustered { .. }) && num_internal > samples.len() {
        log::warn!(
            "clustered knot placement needs {num_internal} samples but only {} are available; \
             falling back to uniform placement",
            samples.len()
        );
        return uniform_knots(num_internal, degree, (0.0, 1.0));
    }
    placement.build(samples, num_internal, degree, (0.0, 1.0))
}

/// Fits a parametric curve through `(x, y)` with successively more knots
/// until the residual target is met or `max_knots` is exhausted.
///
/// Points are chord-length parameterized once; each iteration rebuilds the
/// knot vector at the current interior-knot count via the configured
/// placement strategy and re-fits both coordinates. More knots strictly
/// increase the fitting degrees of freedom, so the residual is expected (not
/// guaranteed, under ill-conditioning) to be non-increasing across
/// iterations.
///
/// Progress is reported through `log::debug!` and, when supplied, the
/// `progress` callback.
pub fn smooth_fit(
    x: ArrayView1<'_, f64>,
    y: ArrayView1<'_, f64>,
    options: &RefineOptions,
    mut progress: Option<&mut dyn FnMut(&RefineProgress)>,
) -> Result<SmoothFit, FitError> {
    let params = chord_lengths(x, y, (0.0, 1.0))?;
    let step = options.knot_step.max(1);

    let mut num_knots = 2;
    let mut iteration = 0;
    loop {
        iteration += 1;
        let knots = build_refined_knots(
            options.placement,
            params.view(),
            num_knots,
            options.degree,
        )?;
        let fit = fit_curve_xy(params.view(), x, y, knots.view(), options.degree)?;
        let residual = fit.residual();

        log::debug!(
            "refinement iteration {iteration}: {num_knots} interior knots, residual {residual:.6e}"
        );
        if let Some(report) = progress.as_deref_mut() {
            report(&RefineProgress {
                iteration,
                num_knots,
                residual,
            });
        }

        let converged = residual <= options.residual_target;
        if converged || num_knots + step >= options.max_knots {
            return Ok(SmoothFit {
                ctrl_x: fit.ctrl_x,
                ctrl_y: fit.ctrl_y,
                knots,
                params,
                residual,
                converged,
            });
        }
        num_knots += step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::curve_point;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal};

    fn noisy_wave(n: usize, sigma: f64, seed: u64) -> (Array1<f64>, Array1<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = Normal::new(0.0, sigma).expect("valid normal distribution");
        let x = Array1::linspace(0.0, 4.0, n);
        let y = x.mapv(|t| (std::f64::consts::PI * t).sin() + noise.sample(&mut rng));
        (x, y)
    }

    #[test]
    fn exact_line_converges_in_the_first_iteration() {
        let x = Array1::linspace(0.0, 3.0, 40);
        let y = x.mapv(|t| 0.5 * t + 1.0);
        let options = RefineOptions {
            residual_target: 1e-8,
            placement: KnotPlacement::Uniform,
            ..RefineOptions::default()
        };

        let mut iterations = 0;
        let mut report = |_p: &RefineProgress| iterations += 1;
        let fit = smooth_fit(x.view(), y.view(), &options, Some(&mut report)).unwrap();

        assert!(fit.converged);
        assert_eq!(iterations, 1);
        assert!(fit.residual <= 1e-8);

        // The fitted curve reproduces the line at its endpoints.
        let degree = options.degree;
        assert_abs_diff_eq!(
            curve_point(degree, fit.knots.view(), fit.ctrl_y.view(), 0.0),
            1.0,
            epsilon = 1e-6
        );
        assert_abs_diff_eq!(
            curve_point(degree, fit.knots.view(), fit.ctrl_y.view(), 1.0),
            2.5,
            epsilon = 1e-6
        );
    }

    #[test]
    fn noisy_data_terminates_with_target_or_exhausted_budget() {
        let (x, y) = noisy_wave(200, 0.05, 7);
        let options = RefineOptions {
            residual_target: 0.01,
            ..RefineOptions::default()
        };

        let mut seen: Vec<RefineProgress> = Vec::new();
        let mut report = |p: &RefineProgress| seen.push(*p);
        let fit = smooth_fit(x.view(), y.view(), &options, Some(&mut report)).unwrap();

        assert!(!seen.is_empty());
        assert_eq!(fit.converged, fit.residual <= options.residual_target);
        let last = seen.last().unwrap();
        assert_abs_diff_eq!(last.residual, fit.residual, epsilon = 0.0);
        if !fit.converged {
            assert!(last.num_knots + options.knot_step >= options.max_knots);
        }

        // Knot counts advance by the configured step.
        for pair in seen.windows(2) {
            assert_eq!(pair[1].num_knots, pair[0].num_knots + options.knot_step);
        }
    }

    #[test]
    fn unreachable_target_exhausts_the_budget_with_a_best_effort_fit() {
        let (x, y) = noisy_wave(120, 0.2, 11);
        let options = RefineOptions {
            residual_target: 1e-16,
            max_knots: 8,
            placement: KnotPlacement::Uniform,
            ..RefineOptions::default()
        };

        let mut seen = 0usize;
        let mut report = |_p: &RefineProgress| seen += 1;
        let fit = smooth_fit(x.view(), y.view(), &options, Some(&mut report)).unwrap();

        assert!(!fit.converged);
        assert!(fit.residual > options.residual_target);
        // Interior knots 2, 4, 6: the step to 8 would reach the budget.
        assert_eq!(seen, 3);
        assert_eq!(fit.ctrl_x.len(), fit.knots.len() - options.degree - 1);
    }

    #[test]
    fn refinement_improves_the_residual_overall() {
        // Knot grids at different counts are not nested, so per-step
        // monotonicity is only expected, not guaranteed; the overall trend
        // must still improve substantially for smooth data.
        let (x, y) = noisy_wave(150, 0.1, 3);
        let options = RefineOptions {
            residual_target: 0.0,
            max_knots: 20,
            placement: KnotPlacement::Uniform,
            ..RefineOptions::default()
        };

        let mut residuals: Vec<f64> = Vec::new();
        let mut report = |p: &RefineProgress| residuals.push(p.residual);
        let _ = smooth_fit(x.view(), y.view(), &options, Some(&mut report)).unwrap();

        assert!(residuals.len() >= 2);
        let first = residuals[0];
        let last = *residuals.last().unwrap();
        assert!(last < first, "residual did not improve: {first} -> {last}");
    }
}
