//! System group and group membership resources.
use anyhow::Result;

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::Executor;

fn group_exists(executor: &dyn Executor, group: &str) -> Result<bool> {
    Ok(executor.run_unchecked("getent", &["group", group])?.success)
}

/// A system group that must exist (e.g. `seat` for seatd).
#[derive(Debug)]
pub struct GroupResource<'a> {
    /// Group name.
    pub name: String,
    executor: &'a dyn Executor,
}

impl<'a> GroupResource<'a> {
    /// Create a new group resource.
    #[must_use]
    pub const fn new(name: String, executor: &'a dyn Executor) -> Self {
        Self { name, executor }
    }
}

impl Applicable for GroupResource<'_> {
    fn description(&self) -> String {
        format!("group {}", self.name)
    }

    fn apply(&self) -> Result<ResourceChange> {
        self.executor.run("groupadd", &["-f", "-r", &self.name])?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for GroupResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        if group_exists(self.executor, &self.name)? {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Missing)
        }
    }
}

/// Membership of the kiosk user in a supplementary group.
#[derive(Debug)]
pub struct GroupMembershipResource<'a> {
    /// User name.
    pub user: String,
    /// Group name.
    pub group: String,
    executor: &'a dyn Executor,
}

impl<'a> GroupMembershipResource<'a> {
    /// Create a new membership resource.
    #[must_use]
    pub const fn new(user: String, group: String, executor: &'a dyn Executor) -> Self {
        Self {
            user,
            group,
            executor,
        }
    }
}

impl Applicable for GroupMembershipResource<'_> {
    fn description(&self) -> String {
        format!("{} in {}", self.user, self.group)
    }

    fn apply(&self) -> Result<ResourceChange> {
        self.executor
            .run("usermod", &["-aG", &self.group, &self.user])?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for GroupMembershipResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        if !group_exists(self.executor, &self.group)? {
            return Ok(ResourceState::Invalid {
                reason: format!("group '{}' does not exist", self.group),
            });
        }
        let result = self.executor.run_unchecked("id", &["-nG", &self.user])?;
        if !result.success {
            return Ok(ResourceState::Invalid {
                reason: format!("user '{}' does not exist", self.user),
            });
        }
        if result.stdout.split_whitespace().any(|g| g == self.group) {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Missing)
        }
    }
}
