//! Enabled systemd unit resource.
use anyhow::Result;

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::Executor;

/// A system unit that must be enabled (not started; the kiosk comes up on
/// the next boot).
#[derive(Debug)]
pub struct SystemdUnitResource<'a> {
    /// Unit name (e.g. `labwc-kiosk.service`).
    pub name: String,
    executor: &'a dyn Executor,
}

impl<'a> SystemdUnitResource<'a> {
    /// Create a new systemd unit resource.
    #[must_use]
    pub const fn new(name: String, executor: &'a dyn Executor) -> Self {
        Self { name, executor }
    }
}

/// Make systemd pick up changed unit files.
///
/// # Errors
///
/// Returns an error if `systemctl daemon-reload` fails.
pub fn daemon_reload(executor: &dyn Executor) -> Result<()> {
    executor.run("systemctl", &["daemon-reload"])?;
    Ok(())
}

impl Applicable for SystemdUnitResource<'_> {
    fn description(&self) -> String {
        self.name.clone()
    }

    fn apply(&self) -> Result<ResourceChange> {
        let result = self
            .executor
            .run_unchecked("systemctl", &["enable", &self.name])?;
        if result.success {
            Ok(ResourceChange::Applied)
        } else {
            Ok(ResourceChange::Skipped {
                reason: format!("failed to enable: {}", result.stderr.trim()),
            })
        }
    }
}

impl Resource for SystemdUnitResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        let result = self
            .executor
            .run_unchecked("systemctl", &["is-enabled", &self.name])?;
        match result.stdout.trim() {
            "enabled" | "enabled-runtime" | "static" | "alias" => Ok(ResourceState::Correct),
            "masked" | "masked-runtime" => Ok(ResourceState::Invalid {
                reason: "unit is masked".to_string(),
            }),
            "" if !result.success => Ok(ResourceState::Missing),
            other => Ok(ResourceState::Incorrect {
                current: other.to_string(),
            }),
        }
    }
}
