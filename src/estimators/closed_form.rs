//! Closed-form per-segment covariance estimators.
//!
//! Each function fits one segment independently and returns a recoverable
//! failure reason (`Err(String)`) instead of panicking on degenerate inputs;
//! the adapter turns any per-segment failure into a whole-call failure so
//! partial covariance sets never escape.

use nalgebra::DMatrix;

use crate::math::{center, column_variances, second_moment};

/// Diagonal covariance: per-column variances floored at `min_var`.
pub fn diagonal(x: &DMatrix<f64>, min_var: f64) -> Result<DMatrix<f64>, String> {
    if x.nrows() == 0 {
        return Err("diagonal: segment has no samples".to_string());
    }
    let vars = column_variances(x);
    let p = x.ncols();
    let mut cov = DMatrix::zeros(p, p);
    for j in 0..p {
        let v = vars[j].max(min_var);
        if !v.is_finite() {
            return Err(format!("diagonal: non-finite variance in column {j}"));
        }
        cov[(j, j)] = v;
    }
    Ok(cov)
}

/// Ledoit–Wolf shrinkage toward the scaled identity.
///
/// Closed form: `Σ = ρ·μI + (1-ρ)·S` with the shrinkage intensity estimated
/// from the data (Ledoit & Wolf 2004, the well-conditioned estimator).
pub fn ledoit_wolf(x: &DMatrix<f64>) -> Result<DMatrix<f64>, String> {
    let n = x.nrows();
    let p = x.ncols();
    if n < 2 {
        return Err("ledoit-wolf: needs at least 2 samples per segment".to_string());
    }

    let xc = center(x);
    let s = second_moment(&xc);

    let mu = s.trace() / p as f64;
    let mut d2 = 0.0;
    for i in 0..p {
        for j in 0..p {
            let target = if i == j { mu } else { 0.0 };
            let d = s[(i, j)] - target;
            d2 += d * d;
        }
    }
    d2 /= p as f64;

    // b̄² = (1 / n²p) Σ_i ‖x_i x_iᵀ − S‖² = (Σ_i ‖x_i‖⁴ − n‖S‖²) / (n²p).
    let s_frob2 = s.iter().map(|v| v * v).sum::<f64>();
    let mut sum_norm4 = 0.0;
    for i in 0..n {
        let norm2 = xc.row(i).iter().map(|v| v * v).sum::<f64>();
        sum_norm4 += norm2 * norm2;
    }
    let nf = n as f64;
    let b_bar2 = (sum_norm4 - nf * s_frob2) / (nf * nf * p as f64);

    let shrinkage = if d2 > 0.0 {
        (b_bar2.min(d2) / d2).clamp(0.0, 1.0)
    } else {
        0.0
    };

    Ok(shrink_to_identity(&s, mu, shrinkage))
}

/// Oracle Approximating Shrinkage toward the scaled identity.
pub fn oas(x: &DMatrix<f64>) -> Result<DMatrix<f64>, String> {
    let n = x.nrows();
    let p = x.ncols() as f64;
    if n < 2 {
        return Err("oas: needs at least 2 samples per segment".to_string());
    }

    let xc = center(x);
    let s = second_moment(&xc);

    let mu = s.trace() / p;
    let tr_s2 = s.iter().map(|v| v * v).sum::<f64>();
    let tr_s = s.trace();

    let num = (1.0 - 2.0 / p) * tr_s2 + tr_s * tr_s;
    let den = (n as f64 + 1.0 - 2.0 / p) * (tr_s2 - tr_s * tr_s / p);
    let shrinkage = if den <= 0.0 {
        1.0
    } else {
        (num / den).clamp(0.0, 1.0)
    };

    Ok(shrink_to_identity(&s, mu, shrinkage))
}

fn shrink_to_identity(s: &DMatrix<f64>, mu: f64, shrinkage: f64) -> DMatrix<f64> {
    let p = s.nrows();
    let mut cov = s * (1.0 - shrinkage);
    for j in 0..p {
        cov[(j, j)] += shrinkage * mu;
    }
    cov
}
