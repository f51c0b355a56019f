//! Covariance estimators behind a single training interface.
//!
//! An [`Estimator`] turns per-segment sample matrices into one covariance per
//! segment. Failure handling is two-tiered:
//!
//! - recoverable numerical problems (invalid component count for the segment
//!   shape, degenerate inputs) yield [`TrainOutcome::Failed`] so a grid
//!   search can skip the candidate
//! - infrastructure problems (external solver missing, crashed, or emitting
//!   garbage) are hard [`AppError`]s that abort the whole run
//!
//! Per-segment fits are independent and run in parallel; a failure in any
//! segment fails the whole call, never leaving a partial covariance set.

pub mod closed_form;
pub mod factor;
pub mod smooth;

use std::time::{Duration, Instant};

use nalgebra::DMatrix;
use rayon::prelude::*;

use crate::domain::{CovarianceSet, FittedModel, ParamSet, TrainOutcome};
use crate::error::AppError;
use crate::solver::{self, SolverConfig};

/// A covariance estimation method with its backing configuration.
#[derive(Debug, Clone)]
pub enum Estimator {
    /// The generating covariances themselves; training ignores the data.
    GroundTruth(CovarianceSet),
    /// Per-column variances with a floor (`min_var`).
    Diagonal,
    LedoitWolf,
    Oas,
    /// Per-segment probabilistic PCA (`n_components`).
    Pca,
    /// Per-segment EM factor analysis (`n_components`, `max_iter`, `tol`).
    FactorAnalysis,
    /// One factor-analysis fit on all segments stacked, shared across them.
    PooledFactor,
    /// Gaussian-kernel smoothing across segments (`bandwidth`, `shrinkage`).
    TimeSmoothed,
    /// External Octave-scripted sparse precision solver.
    Quic(SolverConfig),
    /// External native sparse precision solver.
    BigQuic(SolverConfig),
}

impl Estimator {
    /// Fit one covariance per segment under the given hyperparameters.
    pub fn train(
        &self,
        data: &[DMatrix<f64>],
        params: &ParamSet,
    ) -> Result<TrainOutcome, AppError> {
        match self {
            Estimator::GroundTruth(covs) => Ok(TrainOutcome::Fitted {
                covs: covs.clone(),
                model: None,
            }),

            Estimator::Diagonal => {
                let min_var = params.get_f64_or("min_var", 1e-6)?;
                Ok(per_segment(data, |x| closed_form::diagonal(x, min_var)))
            }
            Estimator::LedoitWolf => Ok(per_segment(data, closed_form::ledoit_wolf)),
            Estimator::Oas => Ok(per_segment(data, closed_form::oas)),

            Estimator::Pca => {
                let k = params.get_usize("n_components")?;
                let fits: Result<Vec<_>, String> = data
                    .par_iter()
                    .map(|x| factor::pca(x, k))
                    .collect();
                Ok(match fits {
                    Ok(models) => {
                        let covs = models.iter().map(|m| m.covariance()).collect();
                        // The last segment's model is the reusable handle.
                        let model = models.into_iter().next_back().map(FittedModel::Factor);
                        TrainOutcome::Fitted { covs, model }
                    }
                    Err(reason) => TrainOutcome::Failed { reason },
                })
            }

            Estimator::FactorAnalysis => {
                let k = params.get_usize("n_components")?;
                let max_iter = params.get_usize("max_iter")?;
                let tol = params.get_f64_or("tol", 1e-4)?;
                let fits: Result<Vec<_>, String> = data
                    .par_iter()
                    .map(|x| factor::factor_analysis(x, k, max_iter, tol))
                    .collect();
                Ok(match fits {
                    Ok(models) => {
                        let covs = models.iter().map(|m| m.covariance()).collect();
                        let model = models.into_iter().next_back().map(FittedModel::Factor);
                        TrainOutcome::Fitted { covs, model }
                    }
                    Err(reason) => TrainOutcome::Failed { reason },
                })
            }

            Estimator::PooledFactor => {
                let k = params.get_usize("n_components")?;
                let max_iter = params.get_usize("max_iter")?;
                let tol = params.get_f64_or("tol", 1e-4)?;
                let fit = factor::stack_segments(data)
                    .and_then(|stacked| factor::factor_analysis(&stacked, k, max_iter, tol));
                Ok(match fit {
                    Ok(model) => {
                        let cov = model.covariance();
                        TrainOutcome::Fitted {
                            covs: vec![cov; data.len()],
                            model: Some(FittedModel::Factor(model)),
                        }
                    }
                    Err(reason) => TrainOutcome::Failed { reason },
                })
            }

            Estimator::TimeSmoothed => {
                let bandwidth = params.get_f64_or("bandwidth", 1.0)?;
                let shrinkage = params.get_f64_or("shrinkage", 0.0)?;
                Ok(match smooth::time_smoothed(data, bandwidth, shrinkage) {
                    Ok((covs, smoother)) => TrainOutcome::Fitted {
                        covs,
                        model: Some(FittedModel::Smoother(smoother)),
                    },
                    Err(reason) => TrainOutcome::Failed { reason },
                })
            }

            Estimator::Quic(cfg) => Ok(TrainOutcome::Fitted {
                covs: solver::quic::train(cfg, data, params)?,
                model: None,
            }),
            Estimator::BigQuic(cfg) => Ok(TrainOutcome::Fitted {
                covs: solver::bigquic::train(cfg, data, params)?,
                model: None,
            }),
        }
    }

    /// Wall-clock training time under fixed hyperparameters.
    ///
    /// External solvers time only the solver protocol (input writes plus the
    /// subprocess), excluding output parsing and inversion; everything else
    /// times the full `train` call. A recoverable fit failure still yields a
    /// duration since the work was done.
    pub fn timeit(&self, data: &[DMatrix<f64>], params: &ParamSet) -> Result<Duration, AppError> {
        match self {
            Estimator::Quic(cfg) => solver::quic::time_solve(cfg, data, params),
            Estimator::BigQuic(cfg) => solver::bigquic::time_solve(cfg, data, params),
            _ => {
                let start = Instant::now();
                let _ = self.train(data, params)?;
                Ok(start.elapsed())
            }
        }
    }
}

/// Run an independent per-segment fit in parallel.
///
/// Any single segment failure fails the whole outcome.
fn per_segment<F>(data: &[DMatrix<f64>], fit: F) -> TrainOutcome
where
    F: Fn(&DMatrix<f64>) -> Result<DMatrix<f64>, String> + Sync,
{
    let covs: Result<Vec<_>, String> = data.par_iter().map(|x| fit(x)).collect();
    match covs {
        Ok(covs) => TrainOutcome::Fitted { covs, model: None },
        Err(reason) => TrainOutcome::Failed { reason },
    }
}
