//! Sample moment computations.
//!
//! Conventions:
//! - a segment matrix is rows = samples, columns = variables
//! - covariances are population-normalized (`/ n`), matching the estimators'
//!   shrinkage formulas
//! - `second_moment` is the *uncentered* `XᵀX / n`, which is what the sparse
//!   solvers consume and what the zero-mean likelihood scores against

use nalgebra::{DMatrix, DVector, RowDVector};

/// Per-column means of a segment matrix.
pub fn column_means(x: &DMatrix<f64>) -> RowDVector<f64> {
    let n = x.nrows().max(1) as f64;
    let mut means = RowDVector::zeros(x.ncols());
    for i in 0..x.nrows() {
        means += x.row(i);
    }
    means / n
}

/// Subtract the per-column mean from every row.
pub fn center(x: &DMatrix<f64>) -> DMatrix<f64> {
    let means = column_means(x);
    let mut out = x.clone();
    for i in 0..out.nrows() {
        let mut row = out.row_mut(i);
        row -= &means;
    }
    out
}

/// Per-column population variances (`/ n`).
pub fn column_variances(x: &DMatrix<f64>) -> DVector<f64> {
    let n = x.nrows().max(1) as f64;
    let means = column_means(x);
    let mut vars = DVector::zeros(x.ncols());
    for j in 0..x.ncols() {
        let mut acc = 0.0;
        for i in 0..x.nrows() {
            let d = x[(i, j)] - means[j];
            acc += d * d;
        }
        vars[j] = acc / n;
    }
    vars
}

/// Centered sample covariance (`/ n`).
pub fn sample_covariance(x: &DMatrix<f64>) -> DMatrix<f64> {
    let centered = center(x);
    second_moment(&centered)
}

/// Uncentered second moment `XᵀX / n`.
pub fn second_moment(x: &DMatrix<f64>) -> DMatrix<f64> {
    let n = x.nrows().max(1) as f64;
    (x.transpose() * x) / n
}
