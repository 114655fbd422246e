//! Task: labwc configuration in the kiosk user's home.
use anyhow::Result;

use super::{Context, ProcessOpts, Task, TaskResult, process_resources};
use crate::artifacts::labwc;
use crate::resources::file::ManagedFile;

/// Write `~/.config/labwc/{rc.xml,autostart,environment}`.
#[derive(Debug)]
pub struct WriteCompositorConfig;

impl Task for WriteCompositorConfig {
    fn name(&self) -> &'static str {
        "Write compositor config"
    }

    fn should_run(&self, _ctx: &Context) -> bool {
        true
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let dir = ctx.home().join(".config/labwc");
        let config = &ctx.config;
        let files = [
            ("rc.xml", labwc::rc_xml(&config.browser)),
            (
                "autostart",
                labwc::autostart(&config.display, &config.logs.dir),
            ),
            ("environment", labwc::environment()),
        ]
        .map(|(name, content)| ManagedFile::new(dir.join(name), content).owned_by(ctx.owner()));
        process_resources(ctx, files, &ProcessOpts::apply_all("write"))
    }
}
