//! Dense linear algebra shared by the OLS, ADF and VAR code.
//!
//! Arrays live in `ndarray` everywhere in the crate; factorizations are done
//! in `nalgebra` after copying the (small) square matrices across.

use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

use crate::defaults::RANK_TOL;
use crate::types::{AnalysisError, Result};

/// Least-squares solution with the pieces needed for inference.
#[derive(Clone, Debug)]
pub(crate) struct LeastSquares {
    pub beta: Array1<f64>,
    /// (X'X)^-1, used for coefficient standard errors.
    pub xtx_inv: Array2<f64>,
    pub fitted: Array1<f64>,
    pub ssr: f64,
}

/// Copy an `ndarray` matrix into a column-major `DMatrix`.
pub(crate) fn to_dmatrix(a: &Array2<f64>) -> DMatrix<f64> {
    let (n, m) = a.dim();
    DMatrix::from_fn(n, m, |i, j| a[[i, j]])
}

pub(crate) fn from_dmatrix(a: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((a.nrows(), a.ncols()), |(i, j)| a[(i, j)])
}

/// Lower Cholesky factor of a symmetric positive-definite matrix.
///
/// # Errors
/// Returns `AnalysisError::SingularCovariance` when the matrix is not
/// positive definite.
pub(crate) fn cholesky_lower(a: &Array2<f64>) -> Result<Array2<f64>> {
    let chol = to_dmatrix(a)
        .cholesky()
        .ok_or(AnalysisError::SingularCovariance)?;
    Ok(from_dmatrix(&chol.l()))
}

/// ln det of a symmetric positive-definite matrix via its Cholesky factor.
pub(crate) fn log_det_spd(a: &Array2<f64>) -> Result<f64> {
    let l = cholesky_lower(a)?;
    Ok(2.0 * l.diag().iter().map(|d| d.ln()).sum::<f64>())
}

/// Solve `min ||y - X b||²` through the normal equations.
///
/// Columns are scaled to unit norm before factorizing so that predictors on
/// very different scales (e.g. funding and funding²) do not trip the rank
/// check. `names` labels the columns of `x` for the error message.
///
/// # Errors
/// Returns `AnalysisError::RankDeficient` naming the first column that is
/// all zeros or a linear combination of the columns before it, and
/// `AnalysisError::LengthMismatch` on shape disagreement.
pub(crate) fn least_squares(
    x: &Array2<f64>,
    y: &Array1<f64>,
    names: &[String],
) -> Result<LeastSquares> {
    let (n, p) = x.dim();
    if y.len() != n {
        return Err(AnalysisError::LengthMismatch {
            expected: n,
            found: y.len(),
        });
    }
    if names.len() != p {
        return Err(AnalysisError::LengthMismatch {
            expected: p,
            found: names.len(),
        });
    }
    if n == 0 || p == 0 {
        return Err(AnalysisError::EmptyInput);
    }

    let xtx = x.t().dot(x);
    let xty = x.t().dot(y);
    let xtx_inv = inverse_gram(&xtx, names)?;

    let beta = xtx_inv.dot(&xty);
    let fitted = x.dot(&beta);
    let ssr = (y - &fitted).mapv(|r| r * r).sum();

    Ok(LeastSquares {
        beta,
        xtx_inv,
        fitted,
        ssr,
    })
}

/// `(X'X)^-1` for a regressor matrix whose columns are linearly independent.
///
/// # Errors
/// `RankDeficient` naming the first dependent column of `x`.
pub(crate) fn gram_inverse(x: &Array2<f64>, names: &[String]) -> Result<Array2<f64>> {
    if names.len() != x.ncols() {
        return Err(AnalysisError::LengthMismatch {
            expected: x.ncols(),
            found: names.len(),
        });
    }
    inverse_gram(&x.t().dot(x), names)
}

/// Invert a Gram matrix `X'X` after equilibrating it to unit diagonal.
fn inverse_gram(xtx: &Array2<f64>, names: &[String]) -> Result<Array2<f64>> {
    let p = xtx.nrows();
    let label = |j: usize| names[j].clone();

    let mut scale = Array1::<f64>::zeros(p);
    for j in 0..p {
        let d = xtx[[j, j]];
        if d <= 0.0 || !d.is_finite() {
            return Err(AnalysisError::RankDeficient { column: label(j) });
        }
        scale[j] = d.sqrt();
    }

    let gram = DMatrix::from_fn(p, p, |i, j| xtx[[i, j]] / (scale[i] * scale[j]));
    let chol = gram.clone().cholesky().ok_or_else(|| AnalysisError::RankDeficient {
        column: label(first_dependent_column(&gram)),
    })?;

    let l = chol.l();
    if let Some(j) = (0..p).find(|&j| l[(j, j)] * l[(j, j)] < RANK_TOL) {
        return Err(AnalysisError::RankDeficient { column: label(j) });
    }

    let gram_inv = chol.inverse();
    Ok(Array2::from_shape_fn((p, p), |(i, j)| {
        gram_inv[(i, j)] / (scale[i] * scale[j])
    }))
}

/// Index of the first column whose leading principal minor stops being
/// positive definite.
fn first_dependent_column(gram: &DMatrix<f64>) -> usize {
    let p = gram.nrows();
    (1..=p)
        .find(|&k| {
            let minor = gram.view((0, 0), (k, k)).into_owned();
            match minor.cholesky() {
                Some(c) => {
                    let d = c.l()[(k - 1, k - 1)];
                    d * d < RANK_TOL
                }
                None => true,
            }
        })
        .map_or(p - 1, |k| k - 1)
}
