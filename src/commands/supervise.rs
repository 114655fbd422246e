//! Command: run the browser under the crash-loop supervisor.
use std::sync::Arc;

use anyhow::Result;

use super::CommandSetup;
use crate::cli::GlobalOpts;
use crate::error::KioskError;
use crate::logging::Logger;
use crate::supervisor::{Settings, SystemRuntime, supervise};

/// Wait for the display socket, then launch and supervise the browser.
///
/// Returns the exit code the process should end with.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded, the signal handler
/// cannot be installed, or the supervisor gives up.
pub fn run(global: &GlobalOpts, log: &Arc<Logger>) -> Result<i32> {
    let setup = CommandSetup::init(global, log)?;
    let settings = Settings::from_env(&setup.config);
    log.debug(&format!(
        "socket {}, {} attempt(s), {:?} grace period",
        settings.socket.display(),
        settings.max_attempts,
        settings.grace_period
    ));
    let runtime = SystemRuntime::install()?;
    let code = supervise(&settings, &runtime, log.as_ref()).map_err(KioskError::from)?;
    Ok(code)
}
