//! Hyperparameter grid expansion and validation-score selection.

pub mod grid;
pub mod select;

pub use grid::expand;
pub use select::{replaces_best, select_best};
