//! Typed error variants for resource operations.
//!
//! Resource code may return these variants directly; callers convert to
//! [`anyhow::Error`] via `?`.

use thiserror::Error;

/// Errors that arise from resource checks and apply operations.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// A command invoked by a resource failed with a non-zero exit code.
    #[error("command '{program}' failed (exit {exit_code}): {stderr}")]
    ExecutionFailed {
        /// Name of the program that was invoked.
        program: String,
        /// Exit code returned by the process.
        exit_code: i32,
        /// Captured standard error output.
        stderr: String,
    },

    /// A process could not be spawned at all.
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        /// Name of the program that could not be started.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
