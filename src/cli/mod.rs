//! Command-line parsing for the covariance benchmark harness.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the estimation/math code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::MethodKind;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "covsel", version, about = "Covariance estimation benchmark harness")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Grid-search each method on synthetic data and print score tables.
    Bench(BenchArgs),
    /// Time one training call per method under its default hyperparameters.
    Time(BenchArgs),
}

/// Common options for benchmarking and timing.
#[derive(Debug, Parser, Clone)]
pub struct BenchArgs {
    /// Methods to run (defaults to every built-in method).
    #[arg(short = 'm', long = "method", value_enum)]
    pub methods: Vec<MethodKind>,

    /// Number of time segments.
    #[arg(short = 's', long, default_value_t = 5)]
    pub segments: usize,

    /// Number of observed variables per segment.
    #[arg(short = 'p', long, default_value_t = 10)]
    pub vars: usize,

    /// Number of latent factors in the ground truth.
    #[arg(short = 'k', long, default_value_t = 3)]
    pub factors: usize,

    /// Training samples per segment.
    #[arg(long, default_value_t = 200)]
    pub train_samples: usize,

    /// Validation samples per segment.
    #[arg(long, default_value_t = 100)]
    pub val_samples: usize,

    /// Held-out test samples per segment.
    #[arg(long, default_value_t = 100)]
    pub test_samples: usize,

    /// Per-segment random-walk step of the ground-truth loadings.
    #[arg(long, default_value_t = 0.1)]
    pub drift: f64,

    /// Smallest diagonal noise in the ground-truth covariances.
    #[arg(long, default_value_t = 0.05)]
    pub noise_floor: f64,

    /// Random seed for data generation.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Installation directory of the Octave-scripted sparse solver
    /// (required for the `quic` method).
    #[arg(long, value_name = "DIR")]
    pub quic_dir: Option<PathBuf>,

    /// Directory containing the native `bigquic-run` executable
    /// (required for the `bigquic` method).
    #[arg(long, value_name = "DIR")]
    pub bigquic_dir: Option<PathBuf>,

    /// Octave interpreter used to run generated solver scripts.
    #[arg(long, default_value = "octave")]
    pub octave_bin: String,

    /// Suppress per-candidate progress lines.
    #[arg(short = 'q', long)]
    pub quiet: bool,
}
