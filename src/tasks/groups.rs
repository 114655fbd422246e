//! Task: seat and device groups for the kiosk user.
use anyhow::Result;

use super::{Context, ProcessOpts, Task, TaskResult, process_resources, task_deps};
use crate::resources::group::{GroupMembershipResource, GroupResource};

/// Create the configured system groups, then add the kiosk user to every
/// group it needs for DRM, input and seat access.
#[derive(Debug)]
pub struct ConfigureUserGroups;

impl Task for ConfigureUserGroups {
    fn name(&self) -> &'static str {
        "Configure user groups"
    }

    task_deps![super::packages::InstallPackages];

    fn should_run(&self, ctx: &Context) -> bool {
        ctx.is_live_root()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let config = &ctx.config;
        if config.create_groups.is_empty() && config.groups.is_empty() {
            return Ok(TaskResult::Skipped("no groups configured".to_string()));
        }

        let executor = &*ctx.executor;
        let groups = config
            .create_groups
            .iter()
            .map(|g| GroupResource::new(g.clone(), executor));
        let created = process_resources(ctx, groups, &ProcessOpts::apply_all("create"))?;

        let memberships = config
            .groups
            .iter()
            .map(|g| GroupMembershipResource::new(ctx.user.name.clone(), g.clone(), executor));
        let added = process_resources(ctx, memberships, &ProcessOpts::apply_all("add"))?;
        Ok(created.merge(added))
    }
}
