//! Tasks: console login path into the kiosk session.
//!
//! On a normal boot `labwc-kiosk.service` owns the display. The autologin
//! on tty1 plus the `~/.profile` hook is the fallback when that service is
//! disabled or has failed.
use anyhow::Result;

use super::{Context, ProcessOpts, Task, TaskResult, process_resources, task_deps};
use crate::artifacts::{AUTOLOGIN_DROPIN, labwc, units};
use crate::resources::file::ManagedFile;
use crate::resources::profile_snippet::ProfileSnippetResource;

/// Write `~/.wayland-session`, which starts labwc from a login shell.
#[derive(Debug)]
pub struct WriteSessionLauncher;

impl Task for WriteSessionLauncher {
    fn name(&self) -> &'static str {
        "Write session launcher"
    }

    fn should_run(&self, _ctx: &Context) -> bool {
        true
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let file = ManagedFile::new(
            ctx.home().join(".wayland-session"),
            labwc::wayland_session(&ctx.config.logs.dir),
        )
        .executable()
        .owned_by(ctx.owner());
        process_resources(ctx, [file], &ProcessOpts::apply_all("write"))
    }
}

/// Append the tty1 hook to `~/.profile`, once.
#[derive(Debug)]
pub struct ConfigureProfileFallback;

impl Task for ConfigureProfileFallback {
    fn name(&self) -> &'static str {
        "Configure profile fallback"
    }

    task_deps![WriteSessionLauncher];

    fn should_run(&self, _ctx: &Context) -> bool {
        true
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let snippet = ProfileSnippetResource::new(
            ctx.home().join(".profile"),
            labwc::PROFILE_GUARD.to_string(),
            labwc::profile_block(),
            ctx.owner(),
        );
        process_resources(ctx, [snippet], &ProcessOpts::apply_all("append to"))
    }
}

/// Autologin drop-in for `getty@tty1.service`.
#[derive(Debug)]
pub struct ConfigureConsoleAutologin;

impl Task for ConfigureConsoleAutologin {
    fn name(&self) -> &'static str {
        "Configure console autologin"
    }

    fn should_run(&self, _ctx: &Context) -> bool {
        true
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let dropin = ManagedFile::new(
            ctx.path(AUTOLOGIN_DROPIN),
            units::autologin_dropin(&ctx.user).render(),
        );
        process_resources(ctx, [dropin], &ProcessOpts::apply_all("write"))
    }
}
