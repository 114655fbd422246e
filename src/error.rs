//! Domain-specific error types for the kiosk provisioning engine.
//!
//! Internal modules return typed errors while command handlers at the CLI
//! boundary convert them to [`anyhow::Error`] via the standard `?` operator.
//!
//! ```text
//! KioskError
//! ├── Precondition(PreconditionError) : root check, kiosk user resolution
//! ├── Supervisor(SupervisorError)     : display socket wait, browser retries
//! └── Resource(ResourceError)         : commands and resource state
//! ```

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub use crate::resources::error::ResourceError;

/// Top-level error type for the kiosk engine.
#[derive(Error, Debug)]
pub enum KioskError {
    /// A precondition for provisioning was not met.
    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    /// The browser supervisor gave up.
    #[error("Supervisor error: {0}")]
    Supervisor(#[from] SupervisorError),

    /// A resource operation failed.
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),
}

/// Errors detected before any provisioning task runs.
#[derive(Error, Debug)]
pub enum PreconditionError {
    /// The process is not running with an effective UID of 0.
    #[error("must be run as root (try: sudo kiosk-setup install)")]
    NotRoot,

    /// No kiosk user was given and `SUDO_USER` is not set.
    #[error("cannot determine kiosk user: pass --user, set `user` in the config, or run via sudo")]
    UserUnspecified,

    /// The named user does not exist in the password database.
    #[error("user '{0}' does not exist")]
    UnknownUser(String),

    /// The kiosk session must not run as root.
    #[error("refusing to configure the kiosk session for root")]
    RootUser,
}

/// Errors that end a `supervise` run with a non-zero exit.
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// The Wayland display socket did not appear in time.
    #[error("display socket not available at {path} after {waited:?}")]
    SocketTimeout {
        /// Socket path that was polled.
        path: PathBuf,
        /// Total time spent waiting.
        waited: Duration,
    },

    /// Every launch attempt crashed within the grace period.
    #[error("browser crashed {attempts} time(s) within the grace period, giving up")]
    RetriesExhausted {
        /// Number of launches made.
        attempts: u32,
    },

    /// The browser binary could not be started at all.
    #[error("failed to start browser '{program}': {source}")]
    Spawn {
        /// Browser executable.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The supervisor was asked to stop before the browser stayed up.
    #[error("interrupted after {attempts} launch attempt(s)")]
    Interrupted {
        /// Number of launches made before the interrupt.
        attempts: u32,
    },
}
