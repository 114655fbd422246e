//! Tasks: helper scripts in the user's home and the browser launcher.
use anyhow::{Context as _, Result};

use super::{Context, ProcessOpts, Task, TaskResult, process_resources};
use crate::artifacts::{INSTALLED_BINARY, LAUNCH_SCRIPT, scripts};
use crate::platform::resolve_boot_file;
use crate::resources::directory::DirectoryResource;
use crate::resources::file::ManagedFile;

/// `~/kiosk-diagnose.sh` and `~/kiosk-test.sh`.
#[derive(Debug)]
pub struct WriteHelperScripts;

impl Task for WriteHelperScripts {
    fn name(&self) -> &'static str {
        "Write helper scripts"
    }

    fn should_run(&self, _ctx: &Context) -> bool {
        true
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let home = ctx.home();
        let config_txt = ctx.live_path(&resolve_boot_file(&ctx.root, &ctx.config.boot.config_txt));
        let files = [
            (
                "kiosk-diagnose.sh",
                scripts::diagnose_script(&ctx.config, &ctx.user, &config_txt),
            ),
            ("kiosk-test.sh", scripts::test_script(&ctx.config)),
        ]
        .map(|(name, content)| {
            ManagedFile::new(home.join(name), content)
                .executable()
                .owned_by(ctx.owner())
        });
        process_resources(ctx, files, &ProcessOpts::apply_all("write"))
    }
}

/// Log directory, `/opt/kiosk/launch-browser.sh`, and a copy of this
/// binary at `/usr/local/bin/kiosk-setup` for the service to exec.
#[derive(Debug)]
pub struct WriteBrowserLauncher;

impl Task for WriteBrowserLauncher {
    fn name(&self) -> &'static str {
        "Write browser launcher"
    }

    fn should_run(&self, _ctx: &Context) -> bool {
        true
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let logs = DirectoryResource::new(ctx.path(&ctx.config.logs.dir), ctx.owner());
        let logs = process_resources(ctx, [logs], &ProcessOpts::apply_all("create"))?;

        let exe = std::env::current_exe().context("locating the running binary")?;
        let binary = std::fs::read(&exe).with_context(|| format!("reading {}", exe.display()))?;
        let files = [
            ManagedFile::new(
                ctx.path(LAUNCH_SCRIPT),
                scripts::launch_script(&ctx.config, &ctx.user, &ctx.config_path),
            )
            .executable(),
            ManagedFile::new(ctx.path(INSTALLED_BINARY), binary).executable(),
        ];
        let installed = process_resources(ctx, files, &ProcessOpts::apply_all("install"))?;
        Ok(logs.merge(installed))
    }
}
