//! Knot-vector construction and B-spline basis evaluation.
//!
//! All spline machinery in this crate funnels through two primitives defined
//! here: [`find_span`], which locates the knot interval containing a
//! parameter, and [`basis_funs`], which evaluates the `degree + 1` basis
//! functions active over that interval via the Cox-de Boor recurrence
//! (Algorithm A2.2 from "The NURBS Book" by Piegl and Tiller).

use ndarray::{Array1, ArrayView1};
use thiserror::Error;

/// Denominators smaller than this are treated as coincident-knot degeneracies.
const DEGENERATE_DENOM_TOL: f64 = 1e-12;

/// Error type for knot-vector construction and validation.
#[derive(Error, Debug)]
pub enum BasisError {
    #[error("Spline degree must be at least 1, but was {0}.")]
    InvalidDegree(usize),

    #[error("Knot range is invalid: left ({0}) must be strictly less than right ({1}).")]
    InvalidRange(f64, f64),

    #[error("At least one interior knot is required, but {0} were requested.")]
    InvalidKnotCount(usize),

    #[error(
        "Clustered knot placement requested {requested} interior knots but only {available} parameter samples were provided."
    )]
    InsufficientSamples { requested: usize, available: usize },

    #[error(
        "Insufficient knots for degree {degree} spline: need at least {required} knots but only {provided} were provided."
    )]
    InsufficientKnotsForDegree {
        degree: usize,
        required: usize,
        provided: usize,
    },

    #[error(
        "The provided knot vector is invalid: {0}. It must be non-decreasing and contain only finite values."
    )]
    InvalidKnotVector(String),
}

fn validate_build_request(
    num_internal: usize,
    degree: usize,
    range: (f64, f64),
) -> Result<(), BasisError> {
    if degree < 1 {
        return Err(BasisError::InvalidDegree(degree));
    }
    if num_internal < 1 {
        return Err(BasisError::InvalidKnotCount(num_internal));
    }
    let (left, right) = range;
    if !(left < right) {
        return Err(BasisError::InvalidRange(left, right));
    }
    Ok(())
}

/// Builds a clamped knot vector with `num_internal` uniformly spaced interior
/// knots over `range`.
///
/// Boundary values are repeated `degree + 1` times so the spline interpolates
/// its endpoints. Total length is `num_internal + 2 * (degree + 1)`.
pub fn uniform_knots(
    num_internal: usize,
    degree: usize,
    range: (f64, f64),
) -> Result<Array1<f64>, BasisError> {
    validate_build_request(num_internal, degree, range)?;
    let (left, right) = range;

    let h = (right - left) / (num_internal as f64 + 1.0);
    let mut knots = Vec::with_capacity(num_internal + 2 * (degree + 1));
    for _ in 0..=degree {
        knots.push(left);
    }
    for i in 1..=num_internal {
        knots.push(left + i as f64 * h);
    }
    for _ in 0..=degree {
        knots.push(right);
    }
    Ok(Array1::from_vec(knots))
}

/// Builds a clamped knot vector whose interior knots sit at the sorted centers
/// of a 1D k-means clustering of `samples` (`k = num_internal`).
///
/// Interior knots track where the parameter samples concentrate, spending
/// degrees of freedom where the data has detail. Clustering degenerates when
/// `num_internal` approaches the number of distinct sample values; requesting
/// more centers than samples is rejected outright.
pub fn clustered_knots(
    samples: ArrayView1<'_, f64>,
    num_internal: usize,
    degree: usize,
    range: (f64, f64),
    max_iter: usize,
) -> Result<Array1<f64>, BasisError> {
    validate_build_request(num_internal, degree, range)?;
    if num_internal > samples.len() {
        return Err(BasisError::InsufficientSamples {
            requested: num_internal,
            available: samples.len(),
        });
    }
    let (left, right) = range;

    let mut centers = kmeans_1d(samples, num_internal, max_iter);
    centers.sort_by(f64::total_cmp);

    let mut knots = Vec::with_capacity(num_internal + 2 * (degree + 1));
    for _ in 0..=degree {
        knots.push(left);
    }
    knots.extend_from_slice(&centers);
    for _ in 0..=degree {
        knots.push(right);
    }
    Ok(Array1::from_vec(knots))
}

/// Lloyd's algorithm in one dimension, seeded with equal-mass (quantile)
/// medoids for determinism. Empty clusters keep their previous center.
fn kmeans_1d(samples: ArrayView1<'_, f64>, k: usize, max_iter: usize) -> Vec<f64> {
    let n = samples.len();
    let mut sorted: Vec<f64> = samples.iter().copied().collect();
    sorted.sort_by(f64::total_cmp);

    let mut centers = Vec::with_capacity(k);
    for c in 0..k {
        let start = c * n / k;
        let end = ((c + 1) * n / k).max(start + 1).min(n);
        centers.push(sorted[(start + end - 1) / 2]);
    }

    let mut assign = vec![0usize; n];
    for _ in 0..max_iter.max(1) {
        let mut changed = false;
        for (i, &x) in sorted.iter().enumerate() {
            let mut best = 0usize;
            let mut best_d2 = f64::INFINITY;
            for (c, &center) in centers.iter().enumerate() {
                let d2 = (x - center) * (x - center);
                if d2 < best_d2 {
                    best_d2 = d2;
                    best = c;
                }
            }
            if assign[i] != best {
                assign[i] = best;
                changed = true;
            }
        }

        let mut sums = vec![0.0_f64; k];
        let mut counts = vec![0usize; k];
        for (i, &x) in sorted.iter().enumerate() {
            sums[assign[i]] += x;
            counts[assign[i]] += 1;
        }
        for c in 0..k {
            if counts[c] > 0 {
                centers[c] = sums[c] / counts[c] as f64;
            }
        }

        if !changed {
            break;
        }
    }
    centers
}

/// Strategy for placing interior knots, dispatched by the fitting loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum KnotPlacement {
    /// Evenly spaced interior knots.
    Uniform,
    /// Interior knots at 1D k-means cluster centers of the parameter samples.
    Clustered { max_iter: usize },
}

impl Default for KnotPlacement {
    fn default() -> Self {
        KnotPlacement::Clustered { max_iter: 25 }
    }
}

impl KnotPlacement {
    /// Builds a clamped knot vector with `num_internal` interior knots over
    /// `range`, consulting `samples` only for the clustered strategy.
    pub fn build(
        &self,
        samples: ArrayView1<'_, f64>,
        num_internal: usize,
        degree: usize,
        range: (f64, f64),
    ) -> Result<Array1<f64>, BasisError> {
        match *self {
            KnotPlacement::Uniform => uniform_knots(num_internal, degree, range),
            KnotPlacement::Clustered { max_iter } => {
                clustered_knots(samples, num_internal, degree, range, max_iter)
            }
        }
    }
}

/// Validates an externally supplied knot vector against a degree.
pub fn validate_knots(knots: ArrayView1<'_, f64>, degree: usize) -> Result<(), BasisError> {
    if degree < 1 {
        return Err(BasisError::InvalidDegree(degree));
    }
    let required = 2 * (degree + 1);
    if knots.len() < required {
        return Err(BasisError::InsufficientKnotsForDegree {
            degree,
            required,
            provided: knots.len(),
        });
    }
    if knots.iter().any(|&k| !k.is_finite()) {
        return Err(BasisError::InvalidKnotVector(
            "knot vector contains non-finite (NaN or Infinity) values".to_string(),
        ));
    }
    for i in 0..(knots.len() - 1) {
        if knots[i] > knots[i + 1] {
            return Err(BasisError::InvalidKnotVector(
                "knot vector is not non-decreasing".to_string(),
            ));
        }
    }
    Ok(())
}

/// Number of control points supported by a knot vector of the given degree.
#[inline]
pub fn num_control_points(knots: ArrayView1<'_, f64>, degree: usize) -> usize {
    knots.len().saturating_sub(degree + 1)
}

/// Locates the knot span containing `u` by binary search.
///
/// Returns the index `i` with `knots[i] <= u < knots[i + 1]`, clamped to the
/// valid span range `degree ..= num_ctrl - 1`. The right boundary
/// `u >= knots[num_ctrl]` maps to span `num_ctrl - 1` so the closing knot
/// belongs to the last span.
pub fn find_span(num_ctrl: usize, degree: usize, u: f64, knots: ArrayView1<'_, f64>) -> usize {
    debug_assert!(num_ctrl >= degree + 1);
    let n = num_ctrl - 1;
    if u >= knots[n + 1] {
        return n;
    }
    if u <= knots[degree] {
        return degree;
    }

    let mut low = degree;
    let mut high = n + 1;
    let mut mid = (low + high) / 2;
    while u < knots[mid] || u >= knots[mid + 1] {
        if u < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    mid
}

/// Reusable buffers for the Cox-de Boor recurrence, shared across points to
/// avoid per-call allocation in design-matrix assembly loops.
#[derive(Clone, Debug)]
pub struct BasisScratch {
    left: Vec<f64>,
    right: Vec<f64>,
}

impl BasisScratch {
    pub fn new(degree: usize) -> Self {
        Self {
            left: vec![0.0; degree + 1],
            right: vec![0.0; degree + 1],
        }
    }

    #[inline]
    fn ensure_degree(&mut self, degree: usize) {
        let len = degree + 1;
        if self.left.len() != len {
            self.left.resize(len, 0.0);
            self.right.resize(len, 0.0);
        }
    }
}

/// Evaluates the `degree + 1` nonzero basis functions over `span` at `u`,
/// writing them into `values`.
///
/// Triangular Cox-de Boor recurrence. A numerically zero denominator means the
/// neighboring knots coincide (interior multiplicity at the degree); the
/// affected value is forced to 1 and that recurrence level stops early rather
/// than dividing by zero. For parameters inside the knot domain the outputs
/// are non-negative and sum to 1.
pub fn basis_funs_into(
    span: usize,
    u: f64,
    degree: usize,
    knots: ArrayView1<'_, f64>,
    values: &mut [f64],
    scratch: &mut BasisScratch,
) {
    debug_assert_eq!(values.len(), degree + 1);
    scratch.ensure_degree(degree);

    values.fill(0.0);
    values[0] = 1.0;

    for j in 1..=degree {
        scratch.left[j] = u - knots[span + 1 - j];
        scratch.right[j] = knots[span + j] - u;
        let mut saved = 0.0;
        for r in 0..j {
            let den = scratch.right[r + 1] + scratch.left[j - r];
            if den.abs() <= DEGENERATE_DENOM_TOL {
                values[r] = 1.0;
                break;
            }
            let temp = values[r] / den;
            values[r] = saved + scratch.right[r + 1] * temp;
            saved = scratch.left[j - r] * temp;
        }
        values[j] = saved;
    }
}

/// Allocating convenience wrapper around [`basis_funs_into`].
pub fn basis_funs(span: usize, u: f64, degree: usize, knots: ArrayView1<'_, f64>) -> Vec<f64> {
    let mut values = vec![0.0; degree + 1];
    let mut scratch = BasisScratch::new(degree);
    basis_funs_into(span, u, degree, knots, &mut values, &mut scratch);
    values
}
