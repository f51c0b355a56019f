//! External solver integration over a file-based protocol.
//!
//! Two solvers live outside the process:
//!
//! - an Octave-scripted sparse precision solver (`quic`), driven by a
//!   generated `.m` script and Octave text-format data files
//! - a native executable (`bigquic`), driven by a generated shell command
//!   file and plain-text matrix files
//!
//! Both follow the same shape: create a run-id-scoped workspace inside the
//! solver's installation directory, serialize inputs, launch the tool and
//! block until it exits, parse the declared output file, and invert the
//! recovered precision matrix. Temporary files are removed on every exit
//! path by the workspace's `Drop`; the process working directory is never
//! changed — the child gets the solver directory via `Command::current_dir`.
//!
//! There is deliberately no subprocess timeout: a hung solver hangs the
//! training call. Invocations are strictly sequential.

pub mod bigquic;
pub mod octave_text;
pub mod quic;
pub mod workspace;

use std::path::PathBuf;

pub use workspace::SolverWorkspace;

/// Location and launcher for one external solver.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Installation directory; inputs, scripts, and outputs live here and the
    /// solver is invoked with this as its working directory.
    pub dir: PathBuf,
    /// Program used to run the generated command file (`octave` or `bash`).
    pub program: String,
}

impl SolverConfig {
    pub fn new(dir: impl Into<PathBuf>, program: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            program: program.into(),
        }
    }
}
