use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use super::{CommandSetup, run_tasks_to_completion};
use crate::cli::{GlobalOpts, InstallOpts};
use crate::error::PreconditionError;
use crate::exec::SystemExecutor;
use crate::logging::{Log, Logger};
use crate::platform::Platform;
use crate::tasks::graph::has_cycle;
use crate::tasks::{self, Context, Task};
use crate::user::KioskUser;

/// Run the install command.
///
/// # Errors
///
/// Returns an error if a precondition fails, the config cannot be loaded,
/// or any task fails.
pub fn run(global: &GlobalOpts, opts: &InstallOpts, log: &Arc<Logger>) -> Result<()> {
    log.info(&format!("kiosk-setup {}", super::version::version()));

    check_privileges(global)?;

    log.stage("Loading configuration");
    let setup = CommandSetup::init(global, log)?;

    let user = KioskUser::resolve(
        &global.root,
        global.user.as_deref(),
        setup.config.user.as_deref(),
    )?;
    let platform = Platform::detect(&global.root);
    log.info(&format!("kiosk user: {} ({})", user.name, user.home.display()));
    log.info(&format!("board: {platform}"));
    if global.root != Path::new("/") {
        log.info(&format!(
            "provisioning image at {}; host commands are skipped",
            global.root.display()
        ));
    }

    let ctx = Context {
        config: Arc::new(setup.config),
        config_path: setup.config_path,
        platform: Arc::new(platform),
        user: Arc::new(user),
        log: Arc::clone(log) as Arc<dyn Log>,
        dry_run: global.dry_run,
        root: global.root.clone(),
        executor: Arc::new(SystemExecutor),
        parallel: global.parallel,
    };

    let all_tasks = tasks::all_install_tasks();
    let selected = select_tasks(&all_tasks, opts);
    if has_cycle(&selected) {
        anyhow::bail!("install tasks have a dependency cycle");
    }

    run_tasks_to_completion(&selected, &ctx, log)
}

/// Refuse to touch the live system without root.
///
/// A dry run or a non-`/` root (an image the caller can already write to)
/// is allowed for anyone.
fn check_privileges(global: &GlobalOpts) -> Result<(), PreconditionError> {
    if global.dry_run || global.root != Path::new("/") || nix::unistd::geteuid().is_root() {
        return Ok(());
    }
    Err(PreconditionError::NotRoot)
}

/// Apply `--only` (substring match, case-insensitive) and then `--skip`.
#[must_use]
pub fn select_tasks<'a>(all: &'a [Box<dyn Task>], opts: &InstallOpts) -> Vec<&'a dyn Task> {
    let matches = |name: &str, patterns: &[String]| {
        let name = name.to_lowercase();
        patterns.iter().any(|p| name.contains(&p.to_lowercase()))
    };
    all.iter()
        .filter(|t| opts.only.is_empty() || matches(t.name(), &opts.only))
        .filter(|t| !matches(t.name(), &opts.skip))
        .map(Box::as_ref)
        .collect()
}
