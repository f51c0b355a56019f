//! Synthetic time-varying Gaussian data.
//!
//! Ground truth is a sequence of factor-model covariances whose loadings
//! drift as a random walk across segments:
//!
//! ```text
//! W_t = W_{t-1} + drift · E_t          (E_t i.i.d. standard normal)
//! Σ_t = W_t · W_tᵀ + diag(noise)
//! ```
//!
//! Each segment then draws zero-mean train/validation/test samples from
//! `N(0, Σ_t)` via the Cholesky factor. Everything is driven by one seed so
//! runs are reproducible.

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, StandardNormal};

use crate::domain::{BenchConfig, CovarianceSet};
use crate::error::AppError;

/// One generated dataset: three aligned sample splits plus the truth.
#[derive(Debug, Clone)]
pub struct SyntheticData {
    pub train: Vec<DMatrix<f64>>,
    pub val: Vec<DMatrix<f64>>,
    pub test: Vec<DMatrix<f64>>,
    pub true_covs: CovarianceSet,
}

pub fn generate(cfg: &BenchConfig) -> Result<SyntheticData, AppError> {
    validate(cfg)?;

    let p = cfg.n_vars;
    let k = cfg.n_factors;
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::numeric(format!("Bad normal distribution: {e}")))?;

    // Loadings start at O(1/√k) so the factor part of the variance is O(1)
    // regardless of the factor count.
    let scale = 1.0 / (k as f64).sqrt();
    let mut loadings =
        DMatrix::from_fn(p, k, |_, _| scale * normal.sample(&mut rng));
    let noise = DVector::from_fn(p, |_, _| {
        rng.gen_range(cfg.noise_floor..cfg.noise_floor + 0.5)
    });

    let mut true_covs = Vec::with_capacity(cfg.n_segments);
    let mut train = Vec::with_capacity(cfg.n_segments);
    let mut val = Vec::with_capacity(cfg.n_segments);
    let mut test = Vec::with_capacity(cfg.n_segments);

    for t in 0..cfg.n_segments {
        if t > 0 {
            for v in loadings.iter_mut() {
                *v += cfg.drift * normal.sample(&mut rng);
            }
        }

        let mut cov = &loadings * loadings.transpose();
        for j in 0..p {
            cov[(j, j)] += noise[j];
        }

        let chol = cov.clone().cholesky().ok_or_else(|| {
            AppError::numeric(format!("Generated covariance for segment {t} is not PD."))
        })?;
        let l_t = chol.l().transpose();

        train.push(draw(&mut rng, cfg.train_samples, &l_t));
        val.push(draw(&mut rng, cfg.val_samples, &l_t));
        test.push(draw(&mut rng, cfg.test_samples, &l_t));
        true_covs.push(cov);
    }

    Ok(SyntheticData {
        train,
        val,
        test,
        true_covs,
    })
}

/// Draw `n` rows of `N(0, L·Lᵀ)` given the transposed Cholesky factor.
fn draw(rng: &mut StdRng, n: usize, l_t: &DMatrix<f64>) -> DMatrix<f64> {
    let p = l_t.nrows();
    let z = DMatrix::from_fn(n, p, |_, _| StandardNormal.sample(rng));
    z * l_t
}

fn validate(cfg: &BenchConfig) -> Result<(), AppError> {
    if cfg.n_segments == 0 {
        return Err(AppError::config("Segment count must be positive."));
    }
    if cfg.n_vars == 0 {
        return Err(AppError::config("Variable count must be positive."));
    }
    if cfg.n_factors == 0 || cfg.n_factors > cfg.n_vars {
        return Err(AppError::config(format!(
            "Factor count {} must lie in 1..={}.",
            cfg.n_factors, cfg.n_vars
        )));
    }
    if cfg.train_samples == 0 || cfg.val_samples == 0 || cfg.test_samples == 0 {
        return Err(AppError::config("Every sample split must be non-empty."));
    }
    if !(cfg.drift.is_finite() && cfg.drift >= 0.0) {
        return Err(AppError::config(format!(
            "Drift {} must be a non-negative finite number.",
            cfg.drift
        )));
    }
    if !(cfg.noise_floor.is_finite() && cfg.noise_floor > 0.0) {
        return Err(AppError::config(format!(
            "Noise floor {} must be positive.",
            cfg.noise_floor
        )));
    }
    Ok(())
}
