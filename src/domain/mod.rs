//! Domain types used throughout the harness.
//!
//! This module defines:
//!
//! - hyperparameter values, specs, and resolved assignments (`ParamValue`,
//!   `ParamSpec`, `ParamSet`)
//! - training outputs (`CovarianceSet`, `FittedModel`, `TrainOutcome`)
//! - the retained selection state (`Selection`)
//! - run configuration (`MethodKind`, `BenchConfig`)

pub mod types;

pub use types::*;
