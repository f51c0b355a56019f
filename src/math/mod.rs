//! Mathematical utilities: sample moments, SPD linear algebra, and the
//! negative-log-likelihood score.

pub mod linalg;
pub mod nll;
pub mod stats;

pub use linalg::*;
pub use nll::*;
pub use stats::*;
