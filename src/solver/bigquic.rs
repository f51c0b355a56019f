//! Native sparse precision solver adapter (`bigquic-run`).
//!
//! Unlike the Octave-scripted solver this one is a standalone executable with
//! a CLI, so the protocol uses plain-text files:
//!
//! - input (per segment): first line `<num_variables> <num_samples>`, then one
//!   space-separated line of 9-decimal values per sample
//! - command file `<id>.sh`: a single `./bigquic-run` invocation with the
//!   hyperparameters as flags and the input/output file names, run via `bash`
//! - output: first line `p: <int>, nnz: <int>`, then `nnz` lines of
//!   `<row> <col> <value>` (1-indexed); unspecified entries are zero
//!
//! A declared `p` that differs from the expected variable count is fatal for
//! the training call; there is no retry.

use std::fs;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use nalgebra::DMatrix;

use crate::domain::{CovarianceSet, ParamSet};
use crate::error::AppError;
use crate::math::spd_inverse;
use crate::solver::{SolverConfig, SolverWorkspace};

/// Estimate one covariance per segment through the native solver.
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
    let verbose = params.get_usize_or("verbose", 0)?;

    let mut ws = SolverWorkspace::create(&cfg.dir)?;
    let command_path = ws.path("sh");
    let input_path = ws.path("in.txt");
    let output_path = ws.path("out.txt");
    let command_name = ws.file_name("sh");
    let input_name = ws.file_name("in.txt");
    let output_name = ws.file_name("out.txt");

    let start = Instant::now();

    fs::write(
        &command_path,
        build_command(lamb, max_iter, verbose, tol, &input_name, &output_name),
    )
    .map_err(|e| AppError::solver(format!("Failed to write solver command file: {e}")))?;

    let mut covs = collect.then(|| Vec::with_capacity(data.len()));

    for x in data {
        fs::write(&input_path, format_samples(x))
            .map_err(|e| AppError::solver(format!("Failed to write solver input: {e}")))?;

        // Blocking wait, no timeout: a hung solver hangs this call.
        let status = Command::new(&cfg.program)
            .arg(&command_name)
            .current_dir(&cfg.dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| {
                AppError::solver(format!("Failed to launch '{}': {e}", cfg.program))
            })?;
        if !status.success() {
            return Err(AppError::solver(format!(
                "Solver command '{command_name}' exited with {status}."
            )));
        }

        if let Some(covs) = covs.as_mut() {
            let text = fs::read_to_string(&output_path).map_err(|e| {
                AppError::solver(format!("Failed to read solver output '{output_name}': {e}"))
            })?;
            let precision = parse_sparse_precision(&text, x.ncols())?;
            covs.push(spd_inverse(&precision)?);
        }
    }

    let elapsed = start.elapsed();
    Ok((covs, elapsed))
}

/// Plain-text sample matrix: shape header, then 9-decimal rows.
pub fn format_samples(x: &DMatrix<f64>) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} {}\n", x.ncols(), x.nrows()));
    for i in 0..x.nrows() {
        for j in 0..x.ncols() {
            if j > 0 {
                out.push(' ');
            }
            out.push_str(&format!("{:.9}", x[(i, j)]));
        }
        out.push('\n');
    }
    out
}

fn build_command(
    lamb: f64,
    max_iter: usize,
    verbose: usize,
    tol: f64,
    input_name: &str,
    output_name: &str,
) -> String {
    format!(
        "./bigquic-run -l {lamb} -t {max_iter} -q {verbose} -e {tol} {input_name} {output_name};\n"
    )
}

/// Parse the sparse precision output into a dense matrix.
///
/// Header: `p: <int>, nnz: <int>`; `p` must match the expected variable
/// count. Entries are 1-indexed; everything unlisted stays zero.
pub fn parse_sparse_precision(text: &str, expected_p: usize) -> Result<DMatrix<f64>, AppError> {
    let mut lines = text.lines();
    let header = lines
        .next()
        .ok_or_else(|| AppError::solver("Solver output is empty."))?;
    let (p, nnz) = parse_header(header).ok_or_else(|| {
        AppError::solver(format!("Malformed solver output header: '{header}'."))
    })?;
    if p != expected_p {
        return Err(AppError::solver(format!(
            "Solver output declares p={p}, expected {expected_p}."
        )));
    }

    let mut precision = DMatrix::zeros(p, p);
    for k in 0..nnz {
        let line = lines.next().ok_or_else(|| {
            AppError::solver(format!(
                "Solver output is truncated: expected {nnz} entries, got {k}."
            ))
        })?;
        let mut parts = line.split_whitespace();
        let row: usize = parts
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| AppError::solver(format!("Malformed entry line {k}: '{line}'.")))?;
        let col: usize = parts
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| AppError::solver(format!("Malformed entry line {k}: '{line}'.")))?;
        let value: f64 = parts
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| AppError::solver(format!("Malformed entry line {k}: '{line}'.")))?;
        if row == 0 || col == 0 || row > p || col > p {
            return Err(AppError::solver(format!(
                "Entry ({row}, {col}) is out of range for p={p}."
            )));
        }
        precision[(row - 1, col - 1)] = value;
    }

    Ok(precision)
}

fn parse_header(line: &str) -> Option<(usize, usize)> {
    let rest = line.trim().strip_prefix("p:")?;
    let (p_part, nnz_part) = rest.split_once(',')?;
    let p = p_part.trim().parse().ok()?;
    let nnz = nnz_part.trim().strip_prefix("nnz:")?.trim().parse().ok()?;
    Some((p, nnz))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_header_is_vars_then_samples() {
        let x = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let text = format_samples(&x);
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), "3 2");
        assert_eq!(
            lines.next().unwrap(),
            "1.000000000 2.000000000 3.000000000"
        );
    }

    #[test]
    fn command_line_carries_all_flags() {
        let cmd = build_command(0.25, 10, 1, 1e-4, "7.in.txt", "7.out.txt");
        assert_eq!(
            cmd,
            "./bigquic-run -l 0.25 -t 10 -q 1 -e 0.0001 7.in.txt 7.out.txt;\n"
        );
    }

    #[test]
    fn sparse_output_round_trips_to_known_covariance() {
        // Precision [[2.0, 0.5], [0.5, 2.0]]; its inverse is
        // (1 / 3.75) * [[2.0, -0.5], [-0.5, 2.0]].
        let text = "p: 2, nnz: 4\n1 1 2.0\n1 2 0.5\n2 1 0.5\n2 2 2.0\n";
        let precision = parse_sparse_precision(text, 2).unwrap();
        assert_eq!(precision[(0, 0)], 2.0);
        assert_eq!(precision[(0, 1)], 0.5);

        let cov = spd_inverse(&precision).unwrap();
        let det = 2.0 * 2.0 - 0.5 * 0.5;
        assert!((cov[(0, 0)] - 2.0 / det).abs() < 1e-12);
        assert!((cov[(0, 1)] + 0.5 / det).abs() < 1e-12);
        assert!((cov[(1, 1)] - 2.0 / det).abs() < 1e-12);
    }

    #[test]
    fn unspecified_entries_stay_zero() {
        let text = "p: 3, nnz: 3\n1 1 1.0\n2 2 1.0\n3 3 1.0\n";
        let precision = parse_sparse_precision(text, 3).unwrap();
        assert_eq!(precision[(0, 1)], 0.0);
        assert_eq!(precision[(2, 0)], 0.0);
    }

    #[test]
    fn shape_mismatch_is_fatal() {
        let text = "p: 4, nnz: 0\n";
        let err = parse_sparse_precision(text, 3).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_SOLVER);
    }

    #[test]
    fn malformed_header_is_fatal() {
        assert!(parse_sparse_precision("vars: 3\n", 3).is_err());
        assert!(parse_sparse_precision("", 3).is_err());
    }

    #[test]
    fn truncated_entries_are_fatal() {
        let text = "p: 2, nnz: 3\n1 1 1.0\n";
        assert!(parse_sparse_precision(text, 2).is_err());
    }

    #[test]
    fn out_of_range_entry_is_fatal() {
        let text = "p: 2, nnz: 1\n3 1 1.0\n";
        assert!(parse_sparse_precision(text, 2).is_err());
    }
}
