//! Benchmark harness: one named method wrapping an estimator.
//!
//! A [`Baseline`] owns an [`Estimator`] and the result of its last `select`
//! run. The lifecycle is strict: `select` (or the pre-trained ground-truth
//! constructor) must run before `evaluate`/`get_covariance`, and calling them
//! earlier is a programming error that panics rather than returning a
//! misleading score.

use std::time::Duration;

use nalgebra::DMatrix;

use crate::domain::{CovarianceSet, ParamSet, ParamSpec, Selection};
use crate::error::AppError;
use crate::estimators::Estimator;
use crate::math::nll_score;
use crate::search::select_best;

pub struct Baseline {
    name: String,
    estimator: Estimator,
    selection: Option<Selection>,
}

impl Baseline {
    pub fn new(name: impl Into<String>, estimator: Estimator) -> Self {
        Self {
            name: name.into(),
            estimator,
            selection: None,
        }
    }

    /// A pre-trained baseline carrying the generating covariances.
    ///
    /// It has no hyperparameters and never runs a search; its validation
    /// score is NaN by convention since nothing was selected.
    pub fn ground_truth(name: impl Into<String>, covs: CovarianceSet) -> Self {
        Self {
            name: name.into(),
            estimator: Estimator::GroundTruth(covs.clone()),
            selection: Some(Selection {
                val_score: f64::NAN,
                params: ParamSet::default(),
                covs: Some(covs),
                model: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Grid-search the hyperparameter space and retain the best candidate.
    ///
    /// Returns the best validation score (NaN when every candidate failed).
    pub fn select(
        &mut self,
        train_data: &[DMatrix<f64>],
        val_data: &[DMatrix<f64>],
        spec: &ParamSpec,
        verbose: bool,
    ) -> Result<f64, AppError> {
        check_segments(train_data, val_data)?;
        if verbose {
            println!("Selecting the best hyperparameters for {} ...", self.name);
        }
        let selection = select_best(&self.estimator, train_data, val_data, spec, verbose)?;
        let score = selection.val_score;
        self.selection = Some(selection);
        Ok(score)
    }

    /// Score the selected model on held-out segments.
    ///
    /// Panics if nothing has been selected yet. Returns NaN when the
    /// selection retained no covariances (every candidate failed).
    pub fn evaluate(&self, test_data: &[DMatrix<f64>]) -> f64 {
        let selection = self
            .selection
            .as_ref()
            .expect("evaluate called before select");
        nll_score(test_data, selection.covs.as_deref())
    }

    /// The selected per-segment covariances.
    ///
    /// Panics if nothing has been selected yet; `None` means every candidate
    /// failed during selection.
    pub fn get_covariance(&self) -> Option<&CovarianceSet> {
        self.selection
            .as_ref()
            .expect("get_covariance called before select")
            .covs
            .as_ref()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Time one training call under fixed hyperparameters.
    ///
    /// Does not touch the retained selection.
    pub fn timeit(
        &self,
        data: &[DMatrix<f64>],
        params: &ParamSet,
    ) -> Result<Duration, AppError> {
        self.estimator.timeit(data, params)
    }
}

/// Input shape checks shared by every method.
///
/// Train and validation sets must be non-empty, segment-aligned, and agree on
/// the variable count across every segment.
fn check_segments(
    train_data: &[DMatrix<f64>],
    val_data: &[DMatrix<f64>],
) -> Result<(), AppError> {
    if train_data.is_empty() || val_data.is_empty() {
        return Err(AppError::data("Training and validation sets must be non-empty."));
    }
    if train_data.len() != val_data.len() {
        return Err(AppError::data(format!(
            "Segment count mismatch: {} training vs {} validation segments.",
            train_data.len(),
            val_data.len()
        )));
    }
    let p = train_data[0].ncols();
    for (i, x) in train_data.iter().chain(val_data.iter()).enumerate() {
        if x.ncols() != p {
            return Err(AppError::data(format!(
                "Segment {i} has {} variables, expected {p}.",
                x.ncols()
            )));
        }
    }
    Ok(())
}
