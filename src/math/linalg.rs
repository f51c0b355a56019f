//! SPD linear algebra helpers.
//!
//! Covariance and precision matrices are assumed symmetric positive-definite.
//! Cholesky is the primary tool; where an estimate is only *nearly* PD we fall
//! back to a generic LU inverse before declaring a numerical failure.

use nalgebra::DMatrix;

use crate::error::AppError;

/// Invert a symmetric positive-definite matrix.
///
/// Cholesky first, LU fallback. A singular matrix is a numerical error; the
/// caller decides whether that is fatal.
pub fn spd_inverse(m: &DMatrix<f64>) -> Result<DMatrix<f64>, AppError> {
    if m.nrows() != m.ncols() {
        return Err(AppError::numeric(format!(
            "Cannot invert a non-square {}x{} matrix.",
            m.nrows(),
            m.ncols()
        )));
    }
    if let Some(chol) = m.clone().cholesky() {
        return Ok(chol.inverse());
    }
    m.clone().try_inverse().ok_or_else(|| {
        AppError::numeric("Matrix inversion failed: estimate is singular or not positive-definite.")
    })
}

/// Log-determinant of an SPD matrix via its Cholesky factor.
///
/// Returns `None` when the matrix is not positive-definite (the NLL score
/// treats that as an unscoreable candidate rather than an error).
pub fn log_det_spd(m: &DMatrix<f64>) -> Option<f64> {
    let chol = m.clone().cholesky()?;
    let l = chol.l();
    let mut acc = 0.0;
    for i in 0..l.nrows() {
        let d = l[(i, i)];
        if d <= 0.0 || !d.is_finite() {
            return None;
        }
        acc += d.ln();
    }
    Some(2.0 * acc)
}
