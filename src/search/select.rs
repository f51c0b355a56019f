//! Grid-search model selection.
//!
//! Every grid point is trained on the training segments and scored on the
//! validation segments with the average Gaussian negative log-likelihood.
//! Failed fits and non-PD covariances score NaN and lose every comparison,
//! except that the very first candidate is always retained so a run where
//! every candidate fails still produces a (NaN-scored) selection.

use nalgebra::DMatrix;

use crate::domain::{ParamSet, ParamSpec, Selection, TrainOutcome};
use crate::error::AppError;
use crate::estimators::Estimator;
use crate::math::nll_score;
use crate::search::grid;

/// Whether `candidate` should replace the current best score.
///
/// The first candidate always wins; afterwards only a non-NaN strictly lower
/// score replaces the incumbent. A NaN incumbent therefore survives until the
/// first finite score arrives.
pub fn replaces_best(current: Option<f64>, candidate: f64) -> bool {
    match current {
        None => true,
        Some(best) => !candidate.is_nan() && (candidate < best || best.is_nan()),
    }
}

/// Train every grid point and keep the best-scoring one.
pub fn select_best(
    estimator: &Estimator,
    train_data: &[DMatrix<f64>],
    val_data: &[DMatrix<f64>],
    spec: &ParamSpec,
    verbose: bool,
) -> Result<Selection, AppError> {
    let points = grid::expand(spec)?;
    let n_points = points.len();

    let mut best: Option<Selection> = None;

    for (i, params) in points.into_iter().enumerate() {
        if verbose {
            println!("done {i} / {n_points} | running with {params}");
        }

        let candidate = score_candidate(estimator, train_data, val_data, params)?;
        if verbose {
            println!("\tcurrent score: {}", candidate.val_score);
        }

        if replaces_best(best.as_ref().map(|b| b.val_score), candidate.val_score) {
            best = Some(candidate);
        }
    }

    // `expand` always yields at least one point.
    let best = best.ok_or_else(|| AppError::config("Hyperparameter grid is empty."))?;
    if verbose {
        println!(
            "Finished with best validation score: {} at {}",
            best.val_score, best.params
        );
    }
    Ok(best)
}

fn score_candidate(
    estimator: &Estimator,
    train_data: &[DMatrix<f64>],
    val_data: &[DMatrix<f64>],
    params: ParamSet,
) -> Result<Selection, AppError> {
    match estimator.train(train_data, &params)? {
        TrainOutcome::Fitted { covs, model } => {
            let val_score = nll_score(val_data, Some(covs.as_slice()));
            Ok(Selection {
                val_score,
                params,
                covs: Some(covs),
                model,
            })
        }
        TrainOutcome::Failed { .. } => Ok(Selection {
            val_score: f64::NAN,
            params,
            covs: None,
            model: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ParamValue, ints};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal};

    #[test]
    fn first_candidate_always_wins_then_nan_never_replaces() {
        // Fold [NaN, 5, 3, NaN, 4] step by step: NaN, 5, 3, 3, 3.
        let scores = [f64::NAN, 5.0, 3.0, f64::NAN, 4.0];
        let mut best: Option<f64> = None;
        let mut trace = Vec::new();
        for s in scores {
            if replaces_best(best, s) {
                best = Some(s);
            }
            trace.push(best.unwrap());
        }
        assert!(trace[0].is_nan());
        assert_eq!(trace[1], 5.0);
        assert_eq!(trace[2], 3.0);
        assert_eq!(trace[3], 3.0);
        assert_eq!(trace[4], 3.0);
    }

    fn gaussian_segments(n_segments: usize, n: usize, p: usize, seed: u64) -> Vec<DMatrix<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        (0..n_segments)
            .map(|_| DMatrix::from_fn(n, p, |_, _| normal.sample(&mut rng)))
            .collect()
    }

    #[test]
    fn single_point_grid_selects_it() {
        let train = gaussian_segments(2, 60, 3, 1);
        let val = gaussian_segments(2, 40, 3, 2);
        let spec = crate::domain::ParamSpec::new().constant("min_var", 1e-6);
        let sel = select_best(&Estimator::Diagonal, &train, &val, &spec, false).unwrap();
        assert!(sel.val_score.is_finite());
        assert!(sel.covs.is_some());
        assert_eq!(sel.params.get_f64("min_var").unwrap(), 1e-6);
    }

    #[test]
    fn failed_candidates_are_skipped_in_favor_of_finite_scores() {
        let train = gaussian_segments(2, 20, 3, 3);
        let val = gaussian_segments(2, 20, 3, 4);
        // n_components 50 is impossible for 20x3 segments; 1 is valid.
        let spec = crate::domain::ParamSpec::new().sweep("n_components", ints(&[50, 1]));
        let sel = select_best(&Estimator::Pca, &train, &val, &spec, false).unwrap();
        assert!(sel.val_score.is_finite());
        assert_eq!(sel.params.get_usize("n_components").unwrap(), 1);
    }

    #[test]
    fn all_failures_yield_a_nan_selection() {
        let train = gaussian_segments(1, 10, 3, 5);
        let val = gaussian_segments(1, 10, 3, 6);
        let spec = crate::domain::ParamSpec::new().sweep(
            "n_components",
            vec![ParamValue::Int(50), ParamValue::Int(60)],
        );
        let sel = select_best(&Estimator::Pca, &train, &val, &spec, false).unwrap();
        assert!(sel.val_score.is_nan());
        assert!(sel.covs.is_none());
    }
}
