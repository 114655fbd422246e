//! Task: firmware and kernel command line settings on the boot partition.
use anyhow::Result;

use super::{Context, ProcessOpts, Task, TaskResult, process_resources};
use crate::platform::resolve_boot_file;
use crate::resources::boot_config::BootConfigResource;
use crate::resources::cmdline::CmdlineResource;

/// Patch `config.txt` and `cmdline.txt` in place.
///
/// A board without a boot partition (or an image whose boot partition is
/// not mounted) is skipped rather than failed.
#[derive(Debug)]
pub struct PatchBootConfig;

impl Task for PatchBootConfig {
    fn name(&self) -> &'static str {
        "Patch boot config"
    }

    fn should_run(&self, _ctx: &Context) -> bool {
        true
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let boot = &ctx.config.boot;
        let config_txt = resolve_boot_file(&ctx.root, &boot.config_txt);
        let cmdline_txt = resolve_boot_file(&ctx.root, &boot.cmdline_txt);

        if !config_txt.is_file() && !cmdline_txt.is_file() {
            return Ok(TaskResult::Skipped(format!(
                "{} not found",
                ctx.live_path(&config_txt).display()
            )));
        }
        if !ctx.platform.is_raspberry_pi() {
            ctx.log
                .debug(&format!("board is {}, patching boot files anyway", ctx.platform));
        }

        let opts = ProcessOpts::apply_all("patch");
        let config = process_resources(
            ctx,
            [BootConfigResource::new(
                config_txt,
                boot.setting_pairs(),
                boot.suppress.clone(),
            )],
            &opts,
        )?;
        let cmdline = process_resources(
            ctx,
            [CmdlineResource::new(cmdline_txt, boot.cmdline.clone())],
            &opts,
        )?;
        Ok(config.merge(cmdline))
    }
}
