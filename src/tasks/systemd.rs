//! Tasks: kiosk unit files and enabling them.
use anyhow::{Context as _, Result};

use super::{Context, ProcessOpts, Task, TaskResult, process_resources, task_deps};
use crate::artifacts::{
    BROWSER_UNIT, LABWC_UNIT, LOGROTATE_RULE, RESTART_TIMER, RESTART_UNIT, SYSTEMD_DIR,
    logrotate, units,
};
use crate::resources::file::ManagedFile;
use crate::resources::systemd_unit::{SystemdUnitResource, daemon_reload};

/// Write the compositor, browser and restart units plus the logrotate rule.
///
/// The restart timer is always written; [`EnableKioskServices`] decides
/// whether it is enabled.
#[derive(Debug)]
pub struct WriteSystemdUnits;

impl Task for WriteSystemdUnits {
    fn name(&self) -> &'static str {
        "Write systemd units"
    }

    task_deps![
        super::scripts::WriteBrowserLauncher,
        super::session::ConfigureConsoleAutologin,
    ];

    fn should_run(&self, _ctx: &Context) -> bool {
        true
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let (config, user) = (&*ctx.config, &*ctx.user);
        let dir = ctx.path(SYSTEMD_DIR);
        let mut files: Vec<ManagedFile> = [
            (LABWC_UNIT, units::labwc_service(config, user)),
            (BROWSER_UNIT, units::browser_service(config, user)),
            (RESTART_UNIT, units::restart_service()),
            (RESTART_TIMER, units::restart_timer(config)),
        ]
        .into_iter()
        .map(|(name, unit)| ManagedFile::new(dir.join(name), unit.render()))
        .collect();
        files.push(ManagedFile::new(
            ctx.path(LOGROTATE_RULE),
            logrotate::rule(&config.logs),
        ));

        let result = process_resources(ctx, files, &ProcessOpts::apply_all("write"))?;
        reload_units(ctx)?;
        Ok(result)
    }
}

/// Run `systemctl daemon-reload` on a live root so later enables see the
/// units just written.
fn reload_units(ctx: &Context) -> Result<()> {
    if ctx.dry_run || !ctx.is_live_root() || !ctx.executor.which("systemctl") {
        return Ok(());
    }
    daemon_reload(&*ctx.executor).context("daemon-reload")?;
    ctx.log.debug("systemd units reloaded");
    Ok(())
}

/// Enable seatd, the compositor, the browser and (optionally) the restart
/// timer. Nothing is started; the kiosk comes up on the next boot.
#[derive(Debug)]
pub struct EnableKioskServices;

impl Task for EnableKioskServices {
    fn name(&self) -> &'static str {
        "Enable kiosk services"
    }

    task_deps![
        WriteSystemdUnits,
        super::packages::InstallPackages,
        super::groups::ConfigureUserGroups,
    ];

    fn should_run(&self, ctx: &Context) -> bool {
        ctx.is_live_root() && ctx.executor.which("systemctl")
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let mut names = vec!["seatd.service", LABWC_UNIT, BROWSER_UNIT];
        if ctx.config.restart.enabled {
            names.push(RESTART_TIMER);
        } else {
            ctx.log.debug("nightly restart disabled, leaving timer alone");
        }
        let resources: Vec<SystemdUnitResource<'_>> = names
            .into_iter()
            .map(|name| SystemdUnitResource::new(name.to_string(), &*ctx.executor))
            .collect();
        process_resources(ctx, resources, &ProcessOpts::apply_all("enable").no_bail())
    }
}
