//! Ordinary least squares solver.
//!
//! We repeatedly solve small regression problems of the form:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! Implementation choices:
//! - SVD handles tall design matrices directly and exposes the singular values,
//!   which we use to detect rank deficiency before solving.
//!   (Nalgebra's `QR::solve` is intended for square systems.)
//! - A rank-deficient matrix is reported, not regularized away: the caller has
//!   to reduce lag depth or polynomial degree.
//! - Parameter counts are tiny (<= 9 columns), so SVD cost is negligible.

use std::fmt;

use nalgebra::{DMatrix, DVector};

/// Singular values below `RANK_RTOL * max_singular_value` count as zero.
const RANK_RTOL: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq)]
pub enum LeastSquaresError {
    /// Fewer rows than coefficients.
    Underdetermined { rows: usize, cols: usize },
    /// Columns are (numerically) linearly dependent.
    RankDeficient { rank: usize, cols: usize },
    /// Inputs or the solution contain NaN/inf.
    NonFinite,
}

impl fmt::Display for LeastSquaresError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Underdetermined { rows, cols } => {
                write!(f, "{rows} observations for {cols} coefficients")
            }
            Self::RankDeficient { rank, cols } => {
                write!(f, "design matrix has rank {rank} < {cols} coefficients")
            }
            Self::NonFinite => write!(f, "non-finite values in least-squares problem"),
        }
    }
}

/// Solve a least squares problem using SVD.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<DVector<f64>, LeastSquaresError> {
    let (rows, cols) = x.shape();
    if rows < cols || cols == 0 {
        return Err(LeastSquaresError::Underdetermined { rows, cols });
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(LeastSquaresError::NonFinite);
    }

    let svd = x.clone().svd(true, true);
    let max_sv = svd.singular_values.max();
    if !(max_sv.is_finite() && max_sv > 0.0) {
        return Err(LeastSquaresError::RankDeficient { rank: 0, cols });
    }

    let tol = max_sv * RANK_RTOL;
    let rank = svd.rank(tol);
    if rank < cols {
        return Err(LeastSquaresError::RankDeficient { rank, cols });
    }

    let beta = svd.solve(y, tol).map_err(|_| LeastSquaresError::NonFinite)?;
    if beta.iter().all(|v| v.is_finite()) {
        Ok(beta)
    } else {
        Err(LeastSquaresError::NonFinite)
    }
}
