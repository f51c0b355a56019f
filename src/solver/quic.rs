//! Octave-scripted sparse precision solver adapter.
//!
//! The solver ships as Octave/MEX sources in its own directory and is driven
//! by a generated script:
//!
//! 1. write `<id>.m` (build + load + solve + save) once per training call
//! 2. per segment: write `<id>.in.oct` with the sample second moment and the
//!    scalar hyperparameters, run `octave <id>.m`, block until exit
//! 3. parse the `X` (precision) field from `<id>.out.oct` and invert it
//!
//! The script and data files are named by the workspace run id and removed on
//! every exit path. Timing (`time_solve`) covers input serialization and the
//! subprocess itself but excludes output parsing and inversion — those are
//! our post-processing, not the solver's work.

use std::fs;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use nalgebra::DMatrix;

use crate::domain::{CovarianceSet, ParamSet};
use crate::error::AppError;
use crate::math::{second_moment, spd_inverse};
use crate::solver::{SolverConfig, SolverWorkspace, octave_text};

/// Estimate one covariance per segment through the external solver.
pub fn train(
    cfg: &SolverConfig,
    data: &[DMatrix<f64>],
    params: &ParamSet,
) -> Result<CovarianceSet, AppError> {
    let (covs, _) = run(cfg, data, params, true)?;
    Ok(covs.unwrap_or_default())
}

/// Wall-clock time of the solver protocol only (no parsing, no inversion).
pub fn time_solve(
    cfg: &SolverConfig,
    data: &[DMatrix<f64>],
    params: &ParamSet,
) -> Result<Duration, AppError> {
    let (_, elapsed) = run(cfg, data, params, false)?;
    Ok(elapsed)
}

fn run(
    cfg: &SolverConfig,
    data: &[DMatrix<f64>],
    params: &ParamSet,
    collect: bool,
) -> Result<(Option<CovarianceSet>, Duration), AppError> {
    let lamb = params.get_f64("lamb")?;
    let max_iter = params.get_usize("max_iter")?;
    let tol = params.get_f64("tol")?;
    let msg = params.get_f64_or("msg", 0.0)?;

    let mut ws = SolverWorkspace::create(&cfg.dir)?;
    let script_path = ws.path("m");
    let input_path = ws.path("in.oct");
    let output_path = ws.path("out.oct");
    let script_name = ws.file_name("m");
    let input_name = ws.file_name("in.oct");
    let output_name = ws.file_name("out.oct");

    let start = Instant::now();

    // One script for the whole call; each segment overwrites the input file.
    fs::write(&script_path, build_script(&input_name, &output_name))
        .map_err(|e| AppError::solver(format!("Failed to write solver script: {e}")))?;

    let mut covs = collect.then(|| Vec::with_capacity(data.len()));

    for x in data {
        let mut input = String::new();
        octave_text::write_matrix(&mut input, "sample_cov", &second_moment(x));
        octave_text::write_scalar(&mut input, "lamb", lamb);
        octave_text::write_scalar(&mut input, "max_iter", max_iter as f64);
        octave_text::write_scalar(&mut input, "tol", tol);
        octave_text::write_scalar(&mut input, "msg", msg);
        fs::write(&input_path, input)
            .map_err(|e| AppError::solver(format!("Failed to write solver input: {e}")))?;

        // Blocking wait, no timeout: a hung solver hangs this call.
        let status = Command::new(&cfg.program)
            .arg(&script_name)
            .current_dir(&cfg.dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| {
                AppError::solver(format!("Failed to launch '{}': {e}", cfg.program))
            })?;
        if !status.success() {
            return Err(AppError::solver(format!(
                "Solver script '{script_name}' exited with {status}."
            )));
        }

        if let Some(covs) = covs.as_mut() {
            let text = fs::read_to_string(&output_path).map_err(|e| {
                AppError::solver(format!("Failed to read solver output '{output_name}': {e}"))
            })?;
            let precision = octave_text::parse_matrix(&text, "X")?;
            if precision.nrows() != x.ncols() || precision.ncols() != x.ncols() {
                return Err(AppError::solver(format!(
                    "Solver returned a {}x{} precision matrix, expected {p}x{p}.",
                    precision.nrows(),
                    precision.ncols(),
                    p = x.ncols(),
                )));
            }
            covs.push(spd_inverse(&precision)?);
        }
    }

    let elapsed = start.elapsed();
    Ok((covs, elapsed))
}

fn build_script(input_name: &str, output_name: &str) -> String {
    let mut s = String::new();
    s.push_str("mex -llapack QUIC.C QUIC-mex.C;\n");
    s.push_str(&format!("load('-text', '{input_name}');\n"));
    s.push_str("[X W opt cputime iter dGap] = QUIC('default', sample_cov, lamb, tol, msg, max_iter);\n");
    s.push_str(&format!(
        "save('-text', '{output_name}', 'X', 'W', 'opt', 'cputime', 'iter', 'dGap');\n"
    ));
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParamValue;
    use std::env;
    use std::path::PathBuf;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("covsel-quic-test-{tag}-{}", rand::random::<u64>()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn solver_params() -> ParamSet {
        let mut p = ParamSet::default();
        p.insert("lamb", ParamValue::Float(0.1));
        p.insert("max_iter", ParamValue::Int(100));
        p.insert("tol", ParamValue::Float(1e-6));
        p.insert("msg", ParamValue::Float(0.0));
        p
    }

    fn segment() -> DMatrix<f64> {
        DMatrix::from_fn(20, 3, |i, j| ((i * 7 + j * 3 + 1) % 11) as f64 / 11.0 - 0.5)
    }

    #[test]
    fn script_references_run_scoped_files() {
        let s = build_script("42.in.oct", "42.out.oct");
        assert!(s.contains("load('-text', '42.in.oct');"));
        assert!(s.contains("QUIC('default', sample_cov, lamb, tol, msg, max_iter)"));
        assert!(s.contains("save('-text', '42.out.oct'"));
        assert!(s.starts_with("mex -llapack QUIC.C QUIC-mex.C;\n"));
    }

    #[test]
    fn missing_output_fails_and_cleans_up() {
        // `true` exits 0 without producing an output file: the parse step must
        // fail and the workspace must still be empty afterwards.
        let dir = scratch_dir("noout");
        let cwd_before = env::current_dir().unwrap();
        let cfg = SolverConfig::new(&dir, "true");
        let err = train(&cfg, &[segment()], &solver_params()).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_SOLVER);
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
        assert_eq!(env::current_dir().unwrap(), cwd_before);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn solver_crash_fails_and_cleans_up() {
        let dir = scratch_dir("crash");
        let cfg = SolverConfig::new(&dir, "false");
        let err = train(&cfg, &[segment()], &solver_params()).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_SOLVER);
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn time_solve_skips_output_parsing() {
        // With parsing excluded, a solver that produces no output still times
        // successfully.
        let dir = scratch_dir("time");
        let cfg = SolverConfig::new(&dir, "true");
        let elapsed = time_solve(&cfg, &[segment(), segment()], &solver_params()).unwrap();
        assert!(elapsed.as_nanos() > 0);
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_hyperparameters_are_config_errors() {
        let dir = scratch_dir("params");
        let cfg = SolverConfig::new(&dir, "true");
        let err = train(&cfg, &[segment()], &ParamSet::default()).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_CONFIG);
        fs::remove_dir_all(&dir).unwrap();
    }
}
