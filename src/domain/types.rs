//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable (where it
//! makes sense) so they can be:
//!
//! - used in-memory during selection/evaluation
//! - printed in progress lines and summary tables
//! - reused by future front-ends without dragging in estimator internals

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::ValueEnum;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// One covariance matrix per segment — the harness's core output.
pub type CovarianceSet = Vec<DMatrix<f64>>;

/// A single hyperparameter value.
///
/// The grid search sweeps heterogeneous hyperparameters (integer component
/// counts, float penalties, boolean flags), so values are tagged rather than
/// forced into `f64`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            ParamValue::Int(v) => Some(v as f64),
            ParamValue::Float(v) => Some(v),
            ParamValue::Bool(_) => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        match *self {
            ParamValue::Int(v) if v >= 0 => Some(v as usize),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            ParamValue::Bool(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// Convenience constructor for a float sweep axis.
pub fn floats(values: &[f64]) -> Vec<ParamValue> {
    values.iter().map(|&v| ParamValue::Float(v)).collect()
}

/// Convenience constructor for an integer sweep axis.
pub fn ints(values: &[i64]) -> Vec<ParamValue> {
    values.iter().map(|&v| ParamValue::Int(v)).collect()
}

/// One entry of a `ParamSpec`.
#[derive(Debug, Clone)]
pub enum ParamEntry {
    /// A constant applied to every grid point; never expands the grid.
    Const(ParamValue),
    /// One grid axis: the candidate values for a single hyperparameter.
    Sweep(Vec<ParamValue>),
    /// One grid axis shared by several related hyperparameters: each grid
    /// point picks exactly one `(inner name, value)` candidate from the
    /// concatenation of all inner lists. Used when alternative knobs of one
    /// penalty family must be swept as a single logical group.
    Group(Vec<(String, Vec<ParamValue>)>),
}

/// Declarative hyperparameter space for one estimator.
///
/// Entry order is preserved: swept axes enter the Cartesian product in the
/// order they were declared, which keeps grid enumeration deterministic.
#[derive(Debug, Clone, Default)]
pub struct ParamSpec {
    entries: Vec<(String, ParamEntry)>,
}

impl ParamSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constant parameter.
    pub fn constant(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.entries
            .push((name.to_string(), ParamEntry::Const(value.into())));
        self
    }

    /// Add a swept axis.
    pub fn sweep(mut self, name: &str, values: Vec<ParamValue>) -> Self {
        self.entries
            .push((name.to_string(), ParamEntry::Sweep(values)));
        self
    }

    /// Add a grouped axis (several inner hyperparameters sharing one axis).
    pub fn group(mut self, name: &str, sub_axes: Vec<(&str, Vec<ParamValue>)>) -> Self {
        let sub_axes = sub_axes
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        self.entries
            .push((name.to_string(), ParamEntry::Group(sub_axes)));
        self
    }

    pub fn entries(&self) -> &[(String, ParamEntry)] {
        &self.entries
    }
}

/// A resolved hyperparameter assignment for one grid point.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParamSet {
    values: BTreeMap<String, ParamValue>,
}

impl ParamSet {
    pub fn insert(&mut self, name: &str, value: ParamValue) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.values.iter()
    }

    /// Look up a required float parameter (integers coerce).
    pub fn get_f64(&self, name: &str) -> Result<f64, AppError> {
        self.values
            .get(name)
            .and_then(ParamValue::as_f64)
            .ok_or_else(|| AppError::config(format!("Missing or non-numeric parameter '{name}'.")))
    }

    /// Look up an optional float parameter, falling back to `default`.
    pub fn get_f64_or(&self, name: &str, default: f64) -> Result<f64, AppError> {
        match self.values.get(name) {
            None => Ok(default),
            Some(v) => v
                .as_f64()
                .ok_or_else(|| AppError::config(format!("Parameter '{name}' is not numeric."))),
        }
    }

    /// Look up a required non-negative integer parameter.
    pub fn get_usize(&self, name: &str) -> Result<usize, AppError> {
        self.values
            .get(name)
            .and_then(ParamValue::as_usize)
            .ok_or_else(|| {
                AppError::config(format!(
                    "Missing or non-integer parameter '{name}' (must be a non-negative integer)."
                ))
            })
    }

    /// Look up an optional non-negative integer parameter.
    pub fn get_usize_or(&self, name: &str, default: usize) -> Result<usize, AppError> {
        match self.values.get(name) {
            None => Ok(default),
            Some(v) => v.as_usize().ok_or_else(|| {
                AppError::config(format!(
                    "Parameter '{name}' is not a non-negative integer."
                ))
            }),
        }
    }

    /// Look up an optional boolean parameter, falling back to `default`.
    pub fn get_bool_or(&self, name: &str, default: bool) -> Result<bool, AppError> {
        match self.values.get(name) {
            None => Ok(default),
            Some(v) => v
                .as_bool()
                .ok_or_else(|| AppError::config(format!("Parameter '{name}' is not a boolean."))),
        }
    }
}

impl std::fmt::Display for ParamSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (k, v) in &self.values {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{k}: {v}")?;
            first = false;
        }
        Ok(())
    }
}

/// A reusable fitted factor model: `cov = loadings · loadingsᵀ + diag(noise)`.
#[derive(Debug, Clone)]
pub struct FactorModel {
    /// `p × k` factor loadings.
    pub loadings: DMatrix<f64>,
    /// Per-variable diagonal noise.
    pub noise: DVector<f64>,
}

impl FactorModel {
    /// Reconstruct the implied covariance matrix.
    pub fn covariance(&self) -> DMatrix<f64> {
        let mut cov = &self.loadings * self.loadings.transpose();
        for j in 0..self.noise.len() {
            cov[(j, j)] += self.noise[j];
        }
        cov
    }
}

/// Fitted state of the kernel-weighted time-varying estimator.
#[derive(Debug, Clone)]
pub struct KernelSmoother {
    pub bandwidth: f64,
    pub shrinkage: f64,
    pub n_segments: usize,
}

/// Estimator-specific reusable model handle.
///
/// Closed-form per-segment fits have no reusable structure and return none.
#[derive(Debug, Clone)]
pub enum FittedModel {
    Factor(FactorModel),
    Smoother(KernelSmoother),
}

/// Result of one training call.
///
/// Recoverable numerical failures (non-convergence, invalid component counts
/// for the segment shape) are an explicit `Failed` value rather than a
/// sentinel; a failed call never yields a partial covariance set.
#[derive(Debug, Clone)]
pub enum TrainOutcome {
    Fitted {
        covs: CovarianceSet,
        model: Option<FittedModel>,
    },
    Failed {
        reason: String,
    },
}

/// The retained result of one `select` run.
///
/// `covs` is `None` only in the degenerate case where every candidate failed;
/// `val_score` is then NaN and callers must check for it.
#[derive(Debug, Clone)]
pub struct Selection {
    pub val_score: f64,
    pub params: ParamSet,
    pub covs: Option<CovarianceSet>,
    pub model: Option<FittedModel>,
}

/// Estimation methods selectable from the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MethodKind {
    Diagonal,
    LedoitWolf,
    Oas,
    Pca,
    FactorAnalysis,
    PooledFactor,
    TimeSmoothed,
    Quic,
    Bigquic,
}

impl MethodKind {
    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            MethodKind::Diagonal => "diagonal",
            MethodKind::LedoitWolf => "ledoit-wolf",
            MethodKind::Oas => "oas",
            MethodKind::Pca => "pca",
            MethodKind::FactorAnalysis => "factor-analysis",
            MethodKind::PooledFactor => "pooled-factor",
            MethodKind::TimeSmoothed => "time-smoothed",
            MethodKind::Quic => "quic",
            MethodKind::Bigquic => "bigquic",
        }
    }

    /// Whether the method delegates estimation to an external process.
    pub fn is_external(self) -> bool {
        matches!(self, MethodKind::Quic | MethodKind::Bigquic)
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub methods: Vec<MethodKind>,

    pub n_segments: usize,
    pub n_vars: usize,
    pub n_factors: usize,
    pub train_samples: usize,
    pub val_samples: usize,
    pub test_samples: usize,

    /// Per-segment random-walk step applied to the ground-truth loadings.
    pub drift: f64,
    /// Smallest diagonal noise added to the ground-truth covariances.
    pub noise_floor: f64,
    pub seed: u64,

    /// Installation directory of the Octave-scripted sparse solver.
    pub quic_dir: Option<PathBuf>,
    /// Installation directory containing the native `bigquic-run` executable.
    pub bigquic_dir: Option<PathBuf>,
    /// Octave interpreter used to run generated solver scripts.
    pub octave_bin: String,

    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_set_typed_accessors() {
        let mut ps = ParamSet::default();
        ps.insert("lamb", ParamValue::Float(0.1));
        ps.insert("max_iter", ParamValue::Int(100));
        ps.insert("msg", ParamValue::Bool(false));

        assert_eq!(ps.get_f64("lamb").unwrap(), 0.1);
        assert_eq!(ps.get_f64("max_iter").unwrap(), 100.0);
        assert_eq!(ps.get_usize("max_iter").unwrap(), 100);
        assert!(!ps.get_bool_or("msg", true).unwrap());
        assert_eq!(ps.get_f64_or("tol", 1e-6).unwrap(), 1e-6);

        assert!(ps.get_f64("missing").is_err());
        assert!(ps.get_usize("lamb").is_err());
        assert!(ps.get_bool_or("lamb", true).is_err());
    }

    #[test]
    fn param_set_display_is_sorted_and_compact() {
        let mut ps = ParamSet::default();
        ps.insert("beta", ParamValue::Float(0.5));
        ps.insert("alpha", ParamValue::Int(2));
        assert_eq!(ps.to_string(), "alpha: 2, beta: 0.5");
    }

    #[test]
    fn factor_model_covariance_shape() {
        let loadings = DMatrix::from_row_slice(3, 1, &[1.0, 0.5, 0.0]);
        let noise = DVector::from_row_slice(&[0.1, 0.1, 0.1]);
        let cov = FactorModel { loadings, noise }.covariance();
        assert_eq!(cov.nrows(), 3);
        assert!((cov[(0, 0)] - 1.1).abs() < 1e-12);
        assert!((cov[(0, 1)] - 0.5).abs() < 1e-12);
        assert!((cov[(2, 2)] - 0.1).abs() < 1e-12);
    }
}
