//! `cov-select` library crate.
//!
//! The binary (`covsel`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - modules are reusable (e.g., future front-ends, notebooks, etc.)
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod bench;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod estimators;
pub mod math;
pub mod report;
pub mod search;
pub mod solver;
