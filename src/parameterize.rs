//! Mapping of data points to scalar spline parameters.

use ndarray::{Array1, ArrayView1};
use thiserror::Error;

/// Zero-width ranges below this are treated as degenerate during scaling.
const DEGENERATE_RANGE_TOL: f64 = 1e-12;

#[derive(Error, Debug)]
pub enum ParameterizeError {
    #[error("Parameter range is invalid: left ({0}) must be strictly less than right ({1}).")]
    InvalidRange(f64, f64),

    #[error("Cannot parameterize an empty point set.")]
    EmptyInput,

    #[error("Coordinate arrays have mismatched lengths: x has {x_len}, y has {y_len}.")]
    LengthMismatch { x_len: usize, y_len: usize },
}

fn validate_range(range: (f64, f64)) -> Result<(), ParameterizeError> {
    let (left, right) = range;
    if !(left < right) {
        return Err(ParameterizeError::InvalidRange(left, right));
    }
    Ok(())
}

/// Min-max scaling of `values` onto `range`.
///
/// A numerically zero input range substitutes a denominator of 1, collapsing
/// every parameter to the left endpoint instead of dividing by zero. Callers
/// get a degenerate constant mapping in that case, not an error.
fn min_max_scale(values: &Array1<f64>, range: (f64, f64)) -> Array1<f64> {
    let (left, right) = range;
    let v_min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let v_max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mut denom = v_max - v_min;
    if denom.abs() <= DEGENERATE_RANGE_TOL {
        denom = 1.0;
    }
    values.mapv(|v| (right - left) * (v - v_min) / denom + left)
}

/// Chord-length parameterization of an ordered point sequence.
///
/// The parameter of point `i` is the cumulative Euclidean arc length up to
/// `i`, min-max scaled onto `range`. Parameters are monotonically
/// non-decreasing along the ordering and span the range exactly for any
/// non-degenerate input; fully coincident points collapse to the left
/// endpoint.
pub fn chord_lengths(
    x: ArrayView1<'_, f64>,
    y: ArrayView1<'_, f64>,
    range: (f64, f64),
) -> Result<Array1<f64>, ParameterizeError> {
    validate_range(range)?;
    if x.len() != y.len() {
        return Err(ParameterizeError::LengthMismatch {
            x_len: x.len(),
            y_len: y.len(),
        });
    }
    if x.is_empty() {
        return Err(ParameterizeError::EmptyInput);
    }

    let mut cumulative = Array1::<f64>::zeros(x.len());
    for i in 1..x.len() {
        let dx = x[i] - x[i - 1];
        let dy = y[i] - y[i - 1];
        cumulative[i] = cumulative[i - 1] + (dx * dx + dy * dy).sqrt();
    }
    Ok(min_max_scale(&cumulative, range))
}

/// Direct coordinate normalization onto `range` by min-max scaling.
///
/// Suitable when one coordinate is already monotone along the data ordering.
/// Identical input values collapse to the left endpoint (degenerate mapping).
pub fn coordinate_map(
    values: ArrayView1<'_, f64>,
    range: (f64, f64),
) -> Result<Array1<f64>, ParameterizeError> {
    validate_range(range)?;
    if values.is_empty() {
        return Err(ParameterizeError::EmptyInput);
    }
    Ok(min_max_scale(&values.to_owned(), range))
}
