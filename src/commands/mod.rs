pub mod install;
mod scheduler;
pub mod supervise;
pub mod version;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::config::KioskConfig;
use crate::config::validation::validate_all;
use crate::logging::Logger;
use crate::tasks::{self, Context, Task};

/// Configuration loaded by every command that reads `kiosk.toml`.
#[derive(Debug)]
pub struct CommandSetup {
    /// Parsed descriptor.
    pub config: KioskConfig,
    /// Where it was loaded from, canonicalized when the file exists.
    pub config_path: PathBuf,
}

impl CommandSetup {
    /// Load the descriptor and report validation warnings.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor exists but cannot be read or parsed.
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        let config_path =
            dunce::canonicalize(&global.config).unwrap_or_else(|_| global.config.clone());
        if config_path.exists() {
            log.debug(&format!("loading {}", config_path.display()));
        } else {
            log.info(&format!(
                "{} not found, using built-in defaults",
                config_path.display()
            ));
        }
        let config = KioskConfig::load(&config_path)?;

        let warnings = validate_all(&config);
        if !warnings.is_empty() {
            log.warn(&format!(
                "found {} configuration warning(s):",
                warnings.len()
            ));
            for warning in &warnings {
                log.warn(&format!(
                    "  {} [{}]: {}",
                    warning.source, warning.item, warning.message
                ));
            }
        }

        Ok(Self {
            config,
            config_path,
        })
    }
}

/// Execute `tasks` (in parallel when the context allows), print the summary,
/// and bail if any task failed.
///
/// # Errors
///
/// Returns an error if one or more tasks recorded a failure.
pub fn run_tasks_to_completion(tasks: &[&dyn Task], ctx: &Context, log: &Arc<Logger>) -> Result<()> {
    if ctx.parallel {
        scheduler::run_tasks_parallel(tasks, ctx, log);
    } else {
        for &task in tasks {
            tasks::execute(task, ctx);
        }
    }

    log.print_summary();

    let count = log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} task(s) failed");
    }
    Ok(())
}
