//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - generates synthetic data
//! - runs selection/evaluation (or timing) per method
//! - prints summary tables

use clap::Parser;

use crate::cli::{BenchArgs, Command};
use crate::domain::{BenchConfig, MethodKind};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `covsel` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Bench(args) => {
            let config = bench_config_from_args(&args);
            let rows = pipeline::run_bench(&config)?;
            println!("{}", crate::report::format_benchmark_table(&rows));
            Ok(())
        }
        Command::Time(args) => {
            let config = bench_config_from_args(&args);
            let rows = pipeline::run_timing(&config)?;
            println!("{}", crate::report::format_timing_table(&rows));
            Ok(())
        }
    }
}

pub fn bench_config_from_args(args: &BenchArgs) -> BenchConfig {
    // No -m flags means "every method that needs no external install".
    let methods = if args.methods.is_empty() {
        vec![
            MethodKind::Diagonal,
            MethodKind::LedoitWolf,
            MethodKind::Oas,
            MethodKind::Pca,
            MethodKind::FactorAnalysis,
            MethodKind::PooledFactor,
            MethodKind::TimeSmoothed,
        ]
    } else {
        args.methods.clone()
    };

    BenchConfig {
        methods,
        n_segments: args.segments,
        n_vars: args.vars,
        n_factors: args.factors,
        train_samples: args.train_samples,
        val_samples: args.val_samples,
        test_samples: args.test_samples,
        drift: args.drift,
        noise_floor: args.noise_floor,
        seed: args.seed,
        quic_dir: args.quic_dir.clone(),
        bigquic_dir: args.bigquic_dir.clone(),
        octave_bin: args.octave_bin.clone(),
        verbose: !args.quiet,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_method_flags_selects_the_builtin_set() {
        let cli = crate::cli::Cli::parse_from(["covsel", "bench", "-q"]);
        let Command::Bench(args) = cli.command else {
            panic!("expected bench");
        };
        let config = bench_config_from_args(&args);
        assert_eq!(config.methods.len(), 7);
        assert!(!config.methods.iter().any(|m| m.is_external()));
        assert!(!config.verbose);
    }

    #[test]
    fn explicit_methods_are_kept_as_given() {
        let cli = crate::cli::Cli::parse_from([
            "covsel", "bench", "-m", "quic", "-m", "diagonal", "--quic-dir", "/opt/quic",
        ]);
        let Command::Bench(args) = cli.command else {
            panic!("expected bench");
        };
        let config = bench_config_from_args(&args);
        assert_eq!(
            config.methods,
            vec![MethodKind::Quic, MethodKind::Diagonal]
        );
        assert_eq!(config.quic_dir.as_deref().unwrap().to_str(), Some("/opt/quic"));
    }
}
