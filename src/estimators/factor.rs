//! Low-rank (factor) covariance estimators.
//!
//! All three fits produce a `FactorModel` (`cov = W·Wᵀ + diag(ψ)`):
//!
//! - `pca`: truncated eigendecomposition with homoscedastic residual noise
//! - `factor_analysis`: heteroscedastic noise fitted by EM on the
//!   variance-scaled data (the SVD-based update)
//! - the pooled variant stacks all segments and fits once, reusing the same
//!   covariance for every segment
//!
//! Component counts that the segment shape cannot support are recoverable
//! failures, not panics: a sweep is expected to include invalid counts.

use nalgebra::{DMatrix, DVector};

use crate::domain::FactorModel;
use crate::math::{center, column_variances};

const NOISE_FLOOR: f64 = 1e-12;

/// Probabilistic PCA: top-`k` eigenpairs, residual noise from the rest.
pub fn pca(x: &DMatrix<f64>, n_components: usize) -> Result<FactorModel, String> {
    let n = x.nrows();
    let p = x.ncols();
    if n_components == 0 || n_components > n.min(p) {
        return Err(format!(
            "pca: n_components={n_components} is outside 1..={} for a {n}x{p} segment",
            n.min(p)
        ));
    }

    let xc = center(x);
    let s = crate::math::second_moment(&xc);
    let eig = s.symmetric_eigen();

    // Eigenpairs sorted by decreasing eigenvalue.
    let mut order: Vec<usize> = (0..p).collect();
    order.sort_by(|&a, &b| {
        eig.eigenvalues[b]
            .partial_cmp(&eig.eigenvalues[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Residual noise is the mean of the discarded spectrum (zero when the
    // model keeps every direction).
    let discarded = p - n_components;
    let sigma2 = if discarded == 0 {
        0.0
    } else {
        order[n_components..]
            .iter()
            .map(|&l| eig.eigenvalues[l].max(0.0))
            .sum::<f64>()
            / discarded as f64
    };

    let mut loadings = DMatrix::zeros(p, n_components);
    for (col, &l) in order[..n_components].iter().enumerate() {
        let scale = (eig.eigenvalues[l] - sigma2).max(0.0).sqrt();
        for row in 0..p {
            loadings[(row, col)] = scale * eig.eigenvectors[(row, l)];
        }
    }

    Ok(FactorModel {
        loadings,
        noise: DVector::from_element(p, sigma2.max(NOISE_FLOOR)),
    })
}

/// Maximum-likelihood factor analysis via EM with the SVD-based update.
pub fn factor_analysis(
    x: &DMatrix<f64>,
    n_components: usize,
    max_iter: usize,
    tol: f64,
) -> Result<FactorModel, String> {
    let n = x.nrows();
    let p = x.ncols();
    if n_components == 0 || n_components >= p || n_components > n {
        return Err(format!(
            "factor-analysis: n_components={n_components} is invalid for a {n}x{p} segment"
        ));
    }
    if n < 2 {
        return Err("factor-analysis: needs at least 2 samples per segment".to_string());
    }

    let xc = center(x);
    let var = column_variances(x);
    let sqrt_n = (n as f64).sqrt();

    let mut psi: DVector<f64> = DVector::from_element(p, 1.0);
    let mut loadings = DMatrix::zeros(p, n_components);

    for _ in 0..max_iter {
        // Scale columns by 1/(√ψ·√n) so the SVD of the scaled data gives the
        // noise-whitened singular spectrum directly.
        let mut scaled = xc.clone();
        for j in 0..p {
            let s = psi[j].sqrt() * sqrt_n;
            for i in 0..n {
                scaled[(i, j)] /= s;
            }
        }

        let svd = scaled.svd(false, true);
        let vt = svd
            .v_t
            .as_ref()
            .ok_or_else(|| "factor-analysis: SVD failed to produce V^T".to_string())?;

        // W = √(max(s² − 1, 0)) · Vᵀ rows, un-whitened by √ψ.
        for c in 0..n_components {
            let s2 = svd.singular_values.get(c).map(|s| s * s).unwrap_or(0.0);
            let scale = (s2 - 1.0).max(0.0).sqrt();
            for j in 0..p {
                loadings[(j, c)] = scale * vt[(c, j)] * psi[j].sqrt();
            }
        }

        // ψ update: residual variance, floored to keep the scaling defined.
        let mut max_delta = 0.0_f64;
        for j in 0..p {
            let explained: f64 = (0..n_components).map(|c| loadings[(j, c)].powi(2)).sum();
            let new_psi = (var[j] - explained).max(NOISE_FLOOR);
            max_delta = max_delta.max((new_psi - psi[j]).abs());
            psi[j] = new_psi;
        }
        if max_delta < tol {
            break;
        }
    }

    // Non-convergence within `max_iter` is not a failure: the fit after the
    // last iteration is still a usable model, and the validation score
    // decides whether it is any good.
    Ok(FactorModel {
        loadings,
        noise: psi,
    })
}

/// Stack segments row-wise for pooled fitting.
pub fn stack_segments(data: &[DMatrix<f64>]) -> Result<DMatrix<f64>, String> {
    let p = data
        .first()
        .map(|x| x.ncols())
        .ok_or_else(|| "pooled fit: no segments".to_string())?;
    let total: usize = data.iter().map(|x| x.nrows()).sum();
    let mut stacked = DMatrix::zeros(total, p);
    let mut offset = 0;
    for x in data {
        stacked.rows_mut(offset, x.nrows()).copy_from(x);
        offset += x.nrows();
    }
    Ok(stacked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal};

    /// Samples from an exact one-factor model with known noise.
    fn one_factor_samples(n: usize, p: usize, seed: u64) -> DMatrix<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        let w: Vec<f64> = (0..p).map(|j| 1.0 + 0.1 * j as f64).collect();
        let mut x = DMatrix::zeros(n, p);
        for i in 0..n {
            let f = normal.sample(&mut rng);
            for j in 0..p {
                x[(i, j)] = w[j] * f + 0.1 * normal.sample(&mut rng);
            }
        }
        x
    }

    #[test]
    fn pca_recovers_dominant_direction() {
        let x = one_factor_samples(500, 4, 7);
        let model = pca(&x, 1).unwrap();
        let cov = model.covariance();
        // The implied covariance must be strongly correlated across variables.
        assert!(cov[(0, 1)] > 0.5);
        assert!(cov.clone().cholesky().is_some());
    }

    #[test]
    fn pca_rejects_unsupported_component_counts() {
        let x = one_factor_samples(10, 4, 1);
        assert!(pca(&x, 0).is_err());
        assert!(pca(&x, 5).is_err());
        // n < p caps the count at n.
        let short = one_factor_samples(3, 4, 2);
        assert!(pca(&short, 4).is_err());
        assert!(pca(&short, 3).is_ok());
    }

    #[test]
    fn factor_analysis_fits_heteroscedastic_noise() {
        let x = one_factor_samples(800, 5, 11);
        let model = factor_analysis(&x, 1, 200, 1e-4).unwrap();
        let cov = model.covariance();
        assert!(cov.clone().cholesky().is_some());
        // Noise stays small relative to the factor variance.
        for j in 0..5 {
            assert!(model.noise[j] < 0.5, "psi[{j}] = {}", model.noise[j]);
        }
    }

    #[test]
    fn factor_analysis_rejects_full_rank_request() {
        let x = one_factor_samples(50, 4, 3);
        assert!(factor_analysis(&x, 4, 100, 1e-4).is_err());
    }

    #[test]
    fn iteration_cap_still_returns_a_model() {
        // An absurdly tight tolerance never converges; the fit after the
        // last EM step is returned anyway.
        let x = one_factor_samples(200, 5, 13);
        let model = factor_analysis(&x, 1, 3, 1e-300).unwrap();
        assert!(model.covariance().cholesky().is_some());
        for j in 0..5 {
            assert!(model.noise[j] > 0.0);
        }
    }

    #[test]
    fn stacking_concatenates_rows() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let b = DMatrix::from_row_slice(1, 2, &[5.0, 6.0]);
        let stacked = stack_segments(&[a, b]).unwrap();
        assert_eq!(stacked.nrows(), 3);
        assert_eq!(stacked[(2, 1)], 6.0);
    }
}
