//! Run-id-scoped temporary file set for one solver invocation.
//!
//! Every external call gets a fresh random 64-bit run id; all of its files
//! are named `<run_id>.<suffix>` inside the solver directory, so sequential
//! or even overlapping runs sharing that directory never collide. Cleanup is
//! tied to `Drop` so that it happens on every exit path, including early
//! returns from parse failures.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AppError;

#[derive(Debug)]
pub struct SolverWorkspace {
    dir: PathBuf,
    run_id: u64,
    files: Vec<PathBuf>,
}

impl SolverWorkspace {
    /// Open a workspace in the solver's installation directory.
    pub fn create(dir: &Path) -> Result<Self, AppError> {
        if !dir.is_dir() {
            return Err(AppError::config(format!(
                "Solver directory '{}' does not exist.",
                dir.display()
            )));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            run_id: rand::random::<u64>(),
            files: Vec::new(),
        })
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name (relative to the solver directory) for a given suffix.
    ///
    /// Command files reference inputs/outputs by these relative names because
    /// the solver runs with its own directory current.
    pub fn file_name(&self, suffix: &str) -> String {
        format!("{}.{suffix}", self.run_id)
    }

    /// Absolute path for a given suffix, registered for cleanup.
    pub fn path(&mut self, suffix: &str) -> PathBuf {
        let path = self.dir.join(self.file_name(suffix));
        if !self.files.contains(&path) {
            self.files.push(path.clone());
        }
        path
    }
}

impl Drop for SolverWorkspace {
    fn drop(&mut self) {
        for path in &self.files {
            // Best effort: a file may legitimately be absent (e.g. the solver
            // crashed before writing its output).
            let _ = fs::remove_file(path);
        }
    }
}
