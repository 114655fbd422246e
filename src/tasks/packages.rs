//! Task: install the kiosk's apt packages.
use anyhow::{Context as _, Result};

use super::{Context, ProcessOpts, Task, TaskResult, finish, process_resource_states};
use crate::logging::ChangeCounts;
use crate::resources::ResourceState;
use crate::resources::package::{PackageResource, batch_install_packages, get_installed_packages};

/// Install compositor, seat daemon, display tools and the browser.
///
/// Installed state is read with one `dpkg-query` call, and everything
/// missing goes into a single `apt-get install`.
#[derive(Debug)]
pub struct InstallPackages;

impl Task for InstallPackages {
    fn name(&self) -> &'static str {
        "Install packages"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        ctx.is_live_root()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        if ctx.config.packages.is_empty() {
            return Ok(TaskResult::Skipped("no packages configured".to_string()));
        }
        if !ctx.executor.which("apt-get") {
            return Ok(TaskResult::Skipped("apt-get not found".to_string()));
        }

        ctx.log.debug(&format!(
            "batch-checking {} packages with a single query",
            ctx.config.packages.len()
        ));
        let installed = get_installed_packages(&*ctx.executor)?;
        let resources: Vec<PackageResource<'_>> = ctx
            .config
            .packages
            .iter()
            .map(|name| PackageResource::new(name.clone(), &*ctx.executor))
            .collect();
        let missing: Vec<&PackageResource<'_>> = resources
            .iter()
            .filter(|r| r.state_from_installed(&installed) == ResourceState::Missing)
            .collect();

        if ctx.dry_run || missing.is_empty() {
            let states: Vec<ResourceState> = resources
                .iter()
                .map(|r| r.state_from_installed(&installed))
                .collect();
            return process_resource_states(
                ctx,
                resources.into_iter().zip(states),
                &ProcessOpts::apply_all("install"),
            );
        }

        let names: Vec<&str> = missing.iter().map(|r| r.name.as_str()).collect();
        ctx.log
            .info(&format!("installing {}", names.join(", ")));
        batch_install_packages(&missing).context("apt-get install failed")?;

        let now = get_installed_packages(&*ctx.executor)?;
        let still_missing: Vec<&str> = names
            .iter()
            .copied()
            .filter(|n| !now.contains(*n))
            .collect();
        if !still_missing.is_empty() {
            anyhow::bail!(
                "still not installed after apt-get: {}",
                still_missing.join(", ")
            );
        }

        let counts = ChangeCounts {
            changed: u32::try_from(missing.len()).unwrap_or(u32::MAX),
            already_ok: u32::try_from(resources.len() - missing.len()).unwrap_or(u32::MAX),
            skipped: 0,
        };
        Ok(finish(ctx, counts))
    }
}
