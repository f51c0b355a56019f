//! Terminal reporting for benchmark and timing runs.

use std::time::Duration;

/// One method's scores in a benchmark run.
#[derive(Debug, Clone)]
pub struct BenchmarkRow {
    pub method: String,
    /// Best validation score from selection; NaN for pre-trained methods.
    pub val_score: f64,
    /// Held-out test score of the selected model.
    pub test_score: f64,
}

/// One method's wall-clock training time.
#[derive(Debug, Clone)]
pub struct TimingRow {
    pub method: String,
    pub elapsed: Duration,
}

/// Render the benchmark summary as an aligned text table.
///
/// NaN scores print as `-` so failed methods are visible without dominating
/// the table.
pub fn format_benchmark_table(rows: &[BenchmarkRow]) -> String {
    let name_width = rows
        .iter()
        .map(|r| r.method.len())
        .chain(std::iter::once("method".len()))
        .max()
        .unwrap_or(6);

    let mut out = String::new();
    out.push_str(&format!(
        "{:<name_width$}  {:>12}  {:>12}\n",
        "method", "val nll", "test nll"
    ));
    for row in rows {
        out.push_str(&format!(
            "{:<name_width$}  {:>12}  {:>12}\n",
            row.method,
            format_score(row.val_score),
            format_score(row.test_score),
        ));
    }
    out
}

/// Render the timing summary as an aligned text table.
pub fn format_timing_table(rows: &[TimingRow]) -> String {
    let name_width = rows
        .iter()
        .map(|r| r.method.len())
        .chain(std::iter::once("method".len()))
        .max()
        .unwrap_or(6);

    let mut out = String::new();
    out.push_str(&format!("{:<name_width$}  {:>12}\n", "method", "seconds"));
    for row in rows {
        out.push_str(&format!(
            "{:<name_width$}  {:>12.3}\n",
            row.method,
            row.elapsed.as_secs_f64()
        ));
    }
    out
}

fn format_score(score: f64) -> String {
    if score.is_nan() {
        "-".to_string()
    } else {
        format!("{score:.4}")
    }
}
