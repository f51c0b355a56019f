//! Shared benchmark pipeline used by the `bench` and `time` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! data generation -> per-method selection -> held-out evaluation -> rows
//!
//! The CLI then focuses on presentation (printing tables).

use crate::bench::Baseline;
use crate::data::{SyntheticData, generate};
use crate::domain::{BenchConfig, MethodKind, ParamSpec, floats, ints};
use crate::error::AppError;
use crate::estimators::Estimator;
use crate::report::{BenchmarkRow, TimingRow};
use crate::search::expand;
use crate::solver::SolverConfig;

/// Run selection and evaluation for every configured method.
///
/// The ground-truth covariances always appear as the first row so every
/// other score has a reference point.
pub fn run_bench(config: &BenchConfig) -> Result<Vec<BenchmarkRow>, AppError> {
    let data = generate(config)?;
    let mut rows = Vec::with_capacity(config.methods.len() + 1);

    let truth = Baseline::ground_truth("ground-truth", data.true_covs.clone());
    rows.push(BenchmarkRow {
        method: truth.name().to_string(),
        val_score: f64::NAN,
        test_score: truth.evaluate(&data.test),
    });

    for &kind in &config.methods {
        rows.push(bench_method(kind, config, &data)?);
    }
    Ok(rows)
}

fn bench_method(
    kind: MethodKind,
    config: &BenchConfig,
    data: &SyntheticData,
) -> Result<BenchmarkRow, AppError> {
    let estimator = make_estimator(kind, config)?;
    let spec = default_spec(kind, config);

    let mut baseline = Baseline::new(kind.display_name(), estimator);
    let val_score = baseline.select(&data.train, &data.val, &spec, config.verbose)?;
    let test_score = baseline.evaluate(&data.test);

    Ok(BenchmarkRow {
        method: baseline.name().to_string(),
        val_score,
        test_score,
    })
}

/// Time one training call per method using the first default grid point.
pub fn run_timing(config: &BenchConfig) -> Result<Vec<TimingRow>, AppError> {
    let data = generate(config)?;
    let mut rows = Vec::with_capacity(config.methods.len());

    for &kind in &config.methods {
        let estimator = make_estimator(kind, config)?;
        let spec = default_spec(kind, config);
        let points = expand(&spec)?;
        // expand never returns an empty list.
        let params = &points[0];

        if config.verbose {
            println!("Timing {} with {params}", kind.display_name());
        }
        let baseline = Baseline::new(kind.display_name(), estimator);
        let elapsed = baseline.timeit(&data.train, params)?;
        rows.push(TimingRow {
            method: kind.display_name().to_string(),
            elapsed,
        });
    }
    Ok(rows)
}

/// Build the estimator backing a method, wiring external solver installs.
pub fn make_estimator(kind: MethodKind, config: &BenchConfig) -> Result<Estimator, AppError> {
    Ok(match kind {
        MethodKind::Diagonal => Estimator::Diagonal,
        MethodKind::LedoitWolf => Estimator::LedoitWolf,
        MethodKind::Oas => Estimator::Oas,
        MethodKind::Pca => Estimator::Pca,
        MethodKind::FactorAnalysis => Estimator::FactorAnalysis,
        MethodKind::PooledFactor => Estimator::PooledFactor,
        MethodKind::TimeSmoothed => Estimator::TimeSmoothed,
        MethodKind::Quic => {
            let dir = config.quic_dir.as_ref().ok_or_else(|| {
                AppError::config("The quic method requires --quic-dir.")
            })?;
            Estimator::Quic(SolverConfig::new(dir, &config.octave_bin))
        }
        MethodKind::Bigquic => {
            let dir = config.bigquic_dir.as_ref().ok_or_else(|| {
                AppError::config("The bigquic method requires --bigquic-dir.")
            })?;
            Estimator::BigQuic(SolverConfig::new(dir, "bash"))
        }
    })
}

/// The default hyperparameter grid for a method.
///
/// Component counts scale with the data shape; penalty sweeps are fixed
/// log-spaced ladders.
pub fn default_spec(kind: MethodKind, config: &BenchConfig) -> ParamSpec {
    match kind {
        MethodKind::Diagonal => ParamSpec::new().constant("min_var", 1e-6),
        MethodKind::LedoitWolf | MethodKind::Oas => ParamSpec::new(),
        MethodKind::Pca => {
            ParamSpec::new().sweep("n_components", component_candidates(config.n_vars + 1))
        }
        MethodKind::FactorAnalysis | MethodKind::PooledFactor => ParamSpec::new()
            .sweep("n_components", component_candidates(config.n_vars))
            .constant("max_iter", 1000i64)
            .constant("tol", 1e-4),
        MethodKind::TimeSmoothed => ParamSpec::new().group(
            "smoothing",
            vec![
                ("bandwidth", floats(&[0.5, 1.0, 2.0, 4.0])),
                ("shrinkage", floats(&[0.1, 0.3])),
            ],
        ),
        MethodKind::Quic => ParamSpec::new()
            .sweep("lamb", floats(&[0.01, 0.03, 0.1, 0.3, 1.0]))
            .constant("max_iter", 100i64)
            .constant("tol", 1e-6)
            .constant("msg", 0i64),
        MethodKind::Bigquic => ParamSpec::new()
            .sweep("lamb", floats(&[0.01, 0.03, 0.1, 0.3, 1.0]))
            .constant("max_iter", 100i64)
            .constant("tol", 1e-4)
            .constant("verbose", 0i64),
    }
}

/// Doubling ladder of component counts strictly below `limit`.
fn component_candidates(limit: usize) -> Vec<crate::domain::ParamValue> {
    let mut counts = Vec::new();
    let mut k = 1usize;
    while k < limit {
        counts.push(k as i64);
        k *= 2;
    }
    if counts.is_empty() {
        counts.push(1);
    }
    ints(&counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParamValue;

    fn small_config() -> BenchConfig {
        BenchConfig {
            methods: vec![
                MethodKind::Diagonal,
                MethodKind::LedoitWolf,
                MethodKind::Pca,
                MethodKind::TimeSmoothed,
            ],
            n_segments: 3,
            n_vars: 5,
            n_factors: 2,
            train_samples: 80,
            val_samples: 40,
            test_samples: 40,
            drift: 0.05,
            noise_floor: 0.05,
            seed: 42,
            quic_dir: None,
            bigquic_dir: None,
            octave_bin: "octave".to_string(),
            verbose: false,
        }
    }

    #[test]
    fn bench_produces_ground_truth_plus_one_row_per_method() {
        let rows = run_bench(&small_config()).unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].method, "ground-truth");
        assert!(rows[0].val_score.is_nan());
        assert!(rows[0].test_score.is_finite());
        for row in &rows[1..] {
            assert!(row.test_score.is_finite(), "{} failed", row.method);
        }
    }

    #[test]
    fn ground_truth_beats_the_diagonal_baseline() {
        let rows = run_bench(&small_config()).unwrap();
        let truth = rows[0].test_score;
        let diagonal = rows
            .iter()
            .find(|r| r.method == "diagonal")
            .unwrap()
            .test_score;
        assert!(truth < diagonal);
    }

    #[test]
    fn timing_covers_every_configured_method() {
        let rows = run_timing(&small_config()).unwrap();
        assert_eq!(rows.len(), 4);
        for row in &rows {
            assert!(row.elapsed.as_nanos() > 0);
        }
    }

    #[test]
    fn external_methods_without_install_dirs_are_config_errors() {
        let config = small_config();
        let err = make_estimator(MethodKind::Quic, &config).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_CONFIG);
        assert!(make_estimator(MethodKind::Bigquic, &config).is_err());
    }

    #[test]
    fn component_ladder_stays_below_the_variable_count() {
        let spec = default_spec(MethodKind::FactorAnalysis, &small_config());
        let points = expand(&spec).unwrap();
        for p in &points {
            assert!(p.get_usize("n_components").unwrap() < 5);
            assert_eq!(p.get("max_iter"), Some(&ParamValue::Int(1000)));
        }
    }
}
