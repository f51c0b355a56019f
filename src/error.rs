//! Process-level error type.
//!
//! Every fallible operation in the harness returns `Result<T, AppError>`.
//! The exit code taxonomy is small and stable:
//!
//! - `2` — invalid configuration / arguments / parameter specs
//! - `3` — insufficient or inconsistent input data
//! - `4` — numerical failure (singular matrices, non-finite results)
//! - `5` — external solver failure (launch, exit status, output protocol)

/// Exit code for invalid configuration or hyperparameter specs.
pub const EXIT_CONFIG: u8 = 2;
/// Exit code for insufficient or inconsistent input data.
pub const EXIT_DATA: u8 = 3;
/// Exit code for numerical failures.
pub const EXIT_NUMERIC: u8 = 4;
/// Exit code for external solver failures.
pub const EXIT_SOLVER: u8 = 5;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    /// Invalid configuration / parameter spec.
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(EXIT_CONFIG, message)
    }

    /// Insufficient or inconsistent input data.
    pub fn data(message: impl Into<String>) -> Self {
        Self::new(EXIT_DATA, message)
    }

    /// Numerical failure.
    pub fn numeric(message: impl Into<String>) -> Self {
        Self::new(EXIT_NUMERIC, message)
    }

    /// External solver failure.
    pub fn solver(message: impl Into<String>) -> Self {
        Self::new(EXIT_SOLVER, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
