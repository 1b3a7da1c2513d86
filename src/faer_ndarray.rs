//! Bridge between `ndarray` storage and `faer` dense kernels.
//!
//! The fitting code keeps everything in `ndarray` containers and only drops
//! down to `faer` for the SVD behind the minimum-norm least-squares solve.

use dyn_stack::{MemBuffer, MemStack};
use faer::diag::{Diag, DiagRef};
use faer::linalg::svd::{self, ComputeSvdVectors};
use faer::{Mat, MatRef, get_global_parallelism};
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Data, Ix2};
use std::marker::PhantomData;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FaerLinalgError {
    #[error("SVD failed to converge")]
    SvdNoConvergence,
    #[error("Dimension mismatch: matrix has {rows} rows but right-hand side has {rhs_len}")]
    RhsDimensionMismatch { rows: usize, rhs_len: usize },
}

/// Zero-copy view of an `ndarray` matrix as a faer `MatRef`.
///
/// Layouts with non-positive strides can alias or reverse memory traversal,
/// which violates assumptions in faer kernels; those are materialized into a
/// compact owned copy instead.
pub struct FaerArrayView<'a> {
    ptr: *const f64,
    rows: usize,
    cols: usize,
    row_stride: isize,
    col_stride: isize,
    owned: Option<Array2<f64>>,
    _marker: PhantomData<&'a f64>,
}

impl<'a> FaerArrayView<'a> {
    pub fn new<S: Data<Elem = f64>>(array: &'a ArrayBase<S, Ix2>) -> Self {
        let (rows, cols) = array.dim();
        let strides = array.strides();
        if strides[0] <= 0 || strides[1] <= 0 {
            let owned = array.to_owned();
            let owned_strides = owned.strides();
            return Self {
                ptr: owned.as_ptr(),
                rows,
                cols,
                row_stride: owned_strides[0],
                col_stride: owned_strides[1],
                owned: Some(owned),
                _marker: PhantomData,
            };
        }

        Self {
            ptr: array.as_ptr(),
            rows,
            cols,
            row_stride: strides[0],
            col_stride: strides[1],
            owned: None,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn as_ref(&self) -> MatRef<'_, f64> {
        let (ptr, rows, cols, row_stride, col_stride) = if let Some(owned) = &self.owned {
            let strides = owned.strides();
            (
                owned.as_ptr(),
                owned.nrows(),
                owned.ncols(),
                strides[0],
                strides[1],
            )
        } else {
            (
                self.ptr,
                self.rows,
                self.cols,
                self.row_stride,
                self.col_stride,
            )
        };
        // SAFETY: pointer/shape/strides either come directly from a live ndarray
        // view with positive strides, or from an owned compact copy stored inside
        // this wrapper, which guarantees validity for the returned view lifetime.
        unsafe { MatRef::from_raw_parts(ptr, rows, cols, row_stride, col_stride) }
    }
}

fn mat_to_array(mat: MatRef<'_, f64>) -> Array2<f64> {
    let mut out = Array2::<f64>::zeros((mat.nrows(), mat.ncols()));
    for j in 0..mat.ncols() {
        for i in 0..mat.nrows() {
            out[[i, j]] = mat[(i, j)];
        }
    }
    out
}

fn diag_to_array(diag: DiagRef<'_, f64>) -> Array1<f64> {
    let mat = diag.column_vector().as_mat();
    let mut out = Array1::<f64>::zeros(mat.nrows());
    for i in 0..mat.nrows() {
        out[i] = mat[(i, 0)];
    }
    out
}

/// Full SVD of a rectangular matrix: `A = U * diag(s) * V^T`.
pub trait FaerSvd {
    fn svd(&self) -> Result<(Array2<f64>, Array1<f64>, Array2<f64>), FaerLinalgError>;
}

impl<S: Data<Elem = f64>> FaerSvd for ArrayBase<S, Ix2> {
    fn svd(&self) -> Result<(Array2<f64>, Array1<f64>, Array2<f64>), FaerLinalgError> {
        let faer_view = FaerArrayView::new(self);
        let faer_mat = faer_view.as_ref();
        let (rows, cols) = faer_mat.shape();

        let mut singular = Diag::<f64>::zeros(rows.min(cols));
        let mut u_storage = Mat::<f64>::zeros(rows, rows);
        let mut v_storage = Mat::<f64>::zeros(cols, cols);

        let par = get_global_parallelism();
        let mut mem = MemBuffer::new(svd::svd_scratch::<f64>(
            rows,
            cols,
            ComputeSvdVectors::Full,
            ComputeSvdVectors::Full,
            par,
            Default::default(),
        ));
        let stack = MemStack::new(&mut mem);

        svd::svd(
            faer_mat,
            singular.as_mut(),
            Some(u_storage.as_mut()),
            Some(v_storage.as_mut()),
            par,
            stack,
            Default::default(),
        )
        .map_err(|_| FaerLinalgError::SvdNoConvergence)?;

        let singular_values = diag_to_array(singular.as_ref());
        let u = mat_to_array(u_storage.as_ref());
        let v_ref = v_storage.as_ref();
        let mut vt = Array2::<f64>::zeros((v_ref.ncols(), v_ref.nrows()));
        for j in 0..v_ref.nrows() {
            for i in 0..v_ref.ncols() {
                vt[[i, j]] = v_ref[(j, i)];
            }
        }

        Ok((u, singular_values, vt))
    }
}

/// Solution of a least-squares problem together with its residual norm.
#[derive(Clone, Debug)]
pub struct Lstsq {
    pub solution: Array1<f64>,
    pub residual: f64,
}

/// Minimum-norm least-squares solve of `A x = b` via the SVD pseudo-inverse.
///
/// Works for any rectangular shape. Rank is decided by the relative cutoff
/// `s_max * max(rows, cols) * EPSILON`; directions below it are dropped, so
/// under-determined and rank-deficient systems return the minimum-norm
/// solution instead of failing. The residual is `||A x - b||_2`.
pub fn lstsq<S: Data<Elem = f64>>(
    a: &ArrayBase<S, Ix2>,
    b: ArrayView1<'_, f64>,
) -> Result<Lstsq, FaerLinalgError> {
    let (rows, cols) = a.dim();
    if b.len() != rows {
        return Err(FaerLinalgError::RhsDimensionMismatch {
            rows,
            rhs_len: b.len(),
        });
    }

    let (u, s, vt) = a.svd()?;
    let s_max = s.iter().cloned().fold(0.0_f64, f64::max);
    let cutoff = s_max * rows.max(cols) as f64 * f64::EPSILON;

    let mut solution = Array1::<f64>::zeros(cols);
    for (i, &sigma) in s.iter().enumerate() {
        if sigma <= cutoff {
            continue;
        }
        let coeff = u.column(i).dot(&b) / sigma;
        solution.scaled_add(coeff, &vt.row(i));
    }

    let residual = vector_norm((&a.dot(&solution) - &b).view());
    Ok(Lstsq { solution, residual })
}

/// Euclidean norm of a vector.
pub fn vector_norm(v: ArrayView1<'_, f64>) -> f64 {
    v.dot(&v).sqrt()
}
