//! Octave text data format (reader/writer subset).
//!
//! The scripted solver exchanges named variables through Octave's plain-text
//! `save`/`load` format. We only need two shapes:
//!
//! ```text
//! # name: sample_cov
//! # type: matrix
//! # rows: 3
//! # columns: 3
//!  1.0 0.2 0.0
//!  ...
//! # name: lamb
//! # type: scalar
//! 0.1
//! ```
//!
//! The writer emits exactly this; the reader scans a saved file for one named
//! matrix field and ignores everything else (the solver's diagnostic outputs
//! are not interpreted).

use nalgebra::DMatrix;

use crate::error::AppError;

/// Append a named matrix field.
pub fn write_matrix(out: &mut String, name: &str, m: &DMatrix<f64>) {
    out.push_str(&format!("# name: {name}\n"));
    out.push_str("# type: matrix\n");
    out.push_str(&format!("# rows: {}\n", m.nrows()));
    out.push_str(&format!("# columns: {}\n", m.ncols()));
    for i in 0..m.nrows() {
        for j in 0..m.ncols() {
            out.push(' ');
            out.push_str(&format!("{:.17e}", m[(i, j)]));
        }
        out.push('\n');
    }
}

/// Append a named scalar field.
pub fn write_scalar(out: &mut String, name: &str, value: f64) {
    out.push_str(&format!("# name: {name}\n"));
    out.push_str("# type: scalar\n");
    out.push_str(&format!("{value:.17e}\n"));
}

/// Extract the named matrix field from saved text.
///
/// Malformed headers, short bodies, or unparseable numbers are protocol
/// errors: the output file came from the solver and there is no retry.
pub fn parse_matrix(text: &str, name: &str) -> Result<DMatrix<f64>, AppError> {
    let mut lines = text.lines();
    let header = format!("# name: {name}");

    loop {
        match lines.next() {
            None => {
                return Err(AppError::solver(format!(
                    "Solver output has no field named '{name}'."
                )));
            }
            Some(line) if line.trim() == header => break,
            Some(_) => continue,
        }
    }

    let type_line = lines
        .next()
        .ok_or_else(|| AppError::solver(format!("Truncated header for field '{name}'.")))?;
    if type_line.trim() != "# type: matrix" {
        return Err(AppError::solver(format!(
            "Field '{name}' is not a matrix (got '{}').",
            type_line.trim()
        )));
    }

    let rows = parse_header_count(lines.next(), "rows", name)?;
    let cols = parse_header_count(lines.next(), "columns", name)?;
    if rows == 0 || cols == 0 {
        return Err(AppError::solver(format!(
            "Field '{name}' declares an empty {rows}x{cols} matrix."
        )));
    }

    let mut m = DMatrix::zeros(rows, cols);
    for i in 0..rows {
        let line = lines.next().ok_or_else(|| {
            AppError::solver(format!(
                "Field '{name}' is truncated: expected {rows} rows, got {i}."
            ))
        })?;
        let mut values = line.split_whitespace();
        for j in 0..cols {
            let token = values.next().ok_or_else(|| {
                AppError::solver(format!("Field '{name}' row {i} has fewer than {cols} columns."))
            })?;
            m[(i, j)] = token.parse::<f64>().map_err(|_| {
                AppError::solver(format!("Field '{name}' row {i} has a non-numeric entry '{token}'."))
            })?;
        }
    }

    Ok(m)
}

fn parse_header_count(line: Option<&str>, key: &str, name: &str) -> Result<usize, AppError> {
    let line = line
        .ok_or_else(|| AppError::solver(format!("Truncated header for field '{name}'.")))?
        .trim();
    let prefix = format!("# {key}:");
    line.strip_prefix(&prefix)
        .and_then(|rest| rest.trim().parse::<usize>().ok())
        .ok_or_else(|| {
            AppError::solver(format!(
                "Malformed '{key}' header for field '{name}': '{line}'."
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_round_trips_through_text() {
        let m = DMatrix::from_row_slice(2, 3, &[1.0, -0.25, 3e-9, 0.0, 42.5, -7.0]);
        let mut text = String::new();
        write_scalar(&mut text, "lamb", 0.1);
        write_matrix(&mut text, "X", &m);
        write_scalar(&mut text, "opt", 12.0);

        let parsed = parse_matrix(&text, "X").unwrap();
        assert_eq!(parsed.nrows(), 2);
        assert_eq!(parsed.ncols(), 3);
        for i in 0..2 {
            for j in 0..3 {
                assert!((parsed[(i, j)] - m[(i, j)]).abs() < 1e-15);
            }
        }
    }

    #[test]
    fn missing_field_is_an_error() {
        let mut text = String::new();
        write_matrix(&mut text, "W", &DMatrix::identity(2, 2));
        let err = parse_matrix(&text, "X").unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_SOLVER);
    }

    #[test]
    fn truncated_body_is_an_error() {
        let text = "# name: X\n# type: matrix\n# rows: 2\n# columns: 2\n 1 2\n";
        assert!(parse_matrix(text, "X").is_err());
    }

    #[test]
    fn scalar_field_rejected_as_matrix() {
        let mut text = String::new();
        write_scalar(&mut text, "X", 3.0);
        assert!(parse_matrix(&text, "X").is_err());
    }
}
