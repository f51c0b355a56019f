//! Data generation for benchmark runs.

pub mod synthetic;

pub use synthetic::{SyntheticData, generate};
