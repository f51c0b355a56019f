//! Kernel-weighted time-varying covariance.
//!
//! Segments are treated as points on a time axis. Each segment's covariance
//! is a Gaussian-kernel-weighted average of all per-segment sample
//! covariances, then shrunk toward its own diagonal:
//!
//! ```text
//! w_ts = exp(-0.5 · ((t - s) / h)²)
//! C_t  = Σ_s w_ts · S_s / Σ_s w_ts
//! Σ_t  = (1 - γ) · C_t + γ · diag(C_t)
//! ```
//!
//! `h` (bandwidth) must be positive and `γ` (shrinkage) must lie in [0, 1];
//! anything else is a recoverable failure since both are swept.

use nalgebra::DMatrix;

use crate::domain::{CovarianceSet, KernelSmoother};
use crate::math::sample_covariance;

pub fn time_smoothed(
    data: &[DMatrix<f64>],
    bandwidth: f64,
    shrinkage: f64,
) -> Result<(CovarianceSet, KernelSmoother), String> {
    if !(bandwidth > 0.0) || !bandwidth.is_finite() {
        return Err(format!("time-smoothed: bandwidth {bandwidth} must be positive"));
    }
    if !(0.0..=1.0).contains(&shrinkage) {
        return Err(format!("time-smoothed: shrinkage {shrinkage} must lie in [0, 1]"));
    }
    if data.is_empty() {
        return Err("time-smoothed: no segments to smooth over".to_string());
    }

    let raw: Vec<DMatrix<f64>> = data.iter().map(sample_covariance).collect();
    if raw.iter().any(|s| s.iter().any(|v| !v.is_finite())) {
        return Err("time-smoothed: a segment produced a non-finite sample covariance".to_string());
    }

    let p = raw[0].nrows();
    let mut covs = Vec::with_capacity(raw.len());
    for t in 0..raw.len() {
        let mut weighted = DMatrix::zeros(p, p);
        let mut total = 0.0;
        for (s, cov) in raw.iter().enumerate() {
            let d = (t as f64 - s as f64) / bandwidth;
            let w = (-0.5 * d * d).exp();
            weighted += cov * w;
            total += w;
        }
        weighted /= total;

        let mut shrunk = &weighted * (1.0 - shrinkage);
        for j in 0..p {
            shrunk[(j, j)] += shrinkage * weighted[(j, j)];
        }
        covs.push(shrunk);
    }

    let smoother = KernelSmoother {
        bandwidth,
        shrinkage,
        n_segments: data.len(),
    };
    Ok((covs, smoother))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaled_segment(scale: f64) -> DMatrix<f64> {
        let base = DMatrix::from_row_slice(
            6,
            2,
            &[
                1.0, 0.5, -1.0, -0.5, 2.0, 1.5, -2.0, -1.5, 0.5, 0.2, -0.5, -0.2,
            ],
        );
        base * scale
    }

    #[test]
    fn tiny_bandwidth_reproduces_per_segment_covariances() {
        let data = vec![scaled_segment(1.0), scaled_segment(3.0)];
        let (covs, _) = time_smoothed(&data, 1e-3, 0.0).unwrap();
        let own = sample_covariance(&data[1]);
        for i in 0..2 {
            for j in 0..2 {
                assert!((covs[1][(i, j)] - own[(i, j)]).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn large_bandwidth_pools_all_segments() {
        let data = vec![scaled_segment(1.0), scaled_segment(3.0), scaled_segment(0.5)];
        let (covs, smoother) = time_smoothed(&data, 1e6, 0.0).unwrap();
        assert_eq!(smoother.n_segments, 3);
        // With near-uniform weights every segment sees the same average.
        for i in 0..2 {
            for j in 0..2 {
                assert!((covs[0][(i, j)] - covs[2][(i, j)]).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn full_shrinkage_yields_diagonal_covariances() {
        let data = vec![scaled_segment(1.0), scaled_segment(2.0)];
        let (covs, _) = time_smoothed(&data, 1.0, 1.0).unwrap();
        for cov in &covs {
            assert_eq!(cov[(0, 1)], 0.0);
            assert!(cov[(0, 0)] > 0.0);
        }
    }

    #[test]
    fn no_segments_is_a_recoverable_failure() {
        assert!(time_smoothed(&[], 1.0, 0.0).is_err());
    }

    #[test]
    fn invalid_hyperparameters_are_recoverable_failures() {
        let data = vec![scaled_segment(1.0)];
        assert!(time_smoothed(&data, 0.0, 0.0).is_err());
        assert!(time_smoothed(&data, -1.0, 0.0).is_err());
        assert!(time_smoothed(&data, 1.0, 1.5).is_err());
        assert!(time_smoothed(&data, 1.0, -0.1).is_err());
    }
}
