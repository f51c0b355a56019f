//! Negative log-likelihood scoring.
//!
//! The common metric across all methods: the average per-sample NLL of
//! held-out segments under a zero-mean Gaussian with the candidate
//! covariances, averaged over segments. Lower is better. `NaN` signals an
//! invalid or unscoreable candidate (missing covariances, segment-count
//! mismatch, non-PD estimate) and is how failed training degrades into the
//! selection rule without aborting the search.

use nalgebra::DMatrix;

use crate::math::{log_det_spd, second_moment, spd_inverse};

/// Score a covariance set against held-out data.
///
/// `covs` is `None` when training failed outright; the score is then `NaN`.
pub fn nll_score(data: &[DMatrix<f64>], covs: Option<&[DMatrix<f64>]>) -> f64 {
    let Some(covs) = covs else {
        return f64::NAN;
    };
    if data.is_empty() || covs.len() != data.len() {
        return f64::NAN;
    }

    let ln_2pi = (2.0 * std::f64::consts::PI).ln();
    let mut total = 0.0;

    for (x, cov) in data.iter().zip(covs.iter()) {
        let n = x.nrows();
        let p = x.ncols();
        if n == 0 || cov.nrows() != p || cov.ncols() != p {
            return f64::NAN;
        }
        let Some(log_det) = log_det_spd(cov) else {
            return f64::NAN;
        };
        let Ok(precision) = spd_inverse(cov) else {
            return f64::NAN;
        };
        let s = second_moment(x);

        // tr(Σ⁻¹ S) without materializing the product: both are symmetric.
        let mut trace = 0.0;
        for i in 0..p {
            for j in 0..p {
                trace += precision[(i, j)] * s[(j, i)];
            }
        }

        let nll = 0.5 * (p as f64 * ln_2pi + log_det + trace);
        if !nll.is_finite() {
            return f64::NAN;
        }
        total += nll;
    }

    total / data.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_segments(n_segments: usize, n: usize, p: usize) -> Vec<DMatrix<f64>> {
        // Deterministic pseudo-data with unit-scale entries.
        (0..n_segments)
            .map(|t| {
                DMatrix::from_fn(n, p, |i, j| {
                    let u = ((i * 31 + j * 17 + t * 7 + 1) % 13) as f64 / 13.0;
                    2.0 * u - 1.0
                })
            })
            .collect()
    }

    #[test]
    fn missing_covariances_score_nan() {
        let data = identity_segments(2, 10, 3);
        assert!(nll_score(&data, None).is_nan());
    }

    #[test]
    fn segment_count_mismatch_scores_nan() {
        let data = identity_segments(2, 10, 3);
        let covs = vec![DMatrix::identity(3, 3)];
        assert!(nll_score(&data, Some(&covs)).is_nan());
    }

    #[test]
    fn non_pd_covariance_scores_nan() {
        let data = identity_segments(1, 10, 2);
        let covs = vec![DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0])];
        assert!(nll_score(&data, Some(&covs)).is_nan());
    }

    #[test]
    fn identity_covariance_matches_closed_form() {
        let data = identity_segments(3, 8, 2);
        let covs = vec![DMatrix::identity(2, 2); 3];
        let score = nll_score(&data, Some(&covs));

        // With Σ = I: NLL = 0.5 * (p ln 2π + tr(S)).
        let ln_2pi = (2.0 * std::f64::consts::PI).ln();
        let mut expected = 0.0;
        for x in &data {
            let s = second_moment(x);
            expected += 0.5 * (2.0 * ln_2pi + s[(0, 0)] + s[(1, 1)]);
        }
        expected /= data.len() as f64;
        assert!((score - expected).abs() < 1e-12);
    }

    #[test]
    fn true_covariance_scores_better_than_inflated() {
        let data = identity_segments(2, 50, 2);
        // The "true" covariance here is the pooled sample second moment.
        let pooled: Vec<DMatrix<f64>> = data.iter().map(second_moment).collect();
        let inflated: Vec<DMatrix<f64>> = pooled.iter().map(|c| c * 10.0).collect();
        let good = nll_score(&data, Some(&pooled));
        let bad = nll_score(&data, Some(&inflated));
        assert!(good < bad);
    }
}
