//! Debian package resource (apt / dpkg).
use std::collections::HashSet;

use anyhow::Result;

use super::{Applicable, ResourceChange, ResourceState};
use crate::exec::Executor;

const APT_ENV: &[(&str, &str)] = &[("DEBIAN_FRONTEND", "noninteractive")];

/// An apt package that must be installed.
///
/// State comes from a single [`get_installed_packages`] query shared by all
/// packages, so this type implements only [`Applicable`].
#[derive(Debug)]
pub struct PackageResource<'a> {
    /// Debian package name.
    pub name: String,
    executor: &'a dyn Executor,
}

impl<'a> PackageResource<'a> {
    /// Create a new package resource.
    #[must_use]
    pub const fn new(name: String, executor: &'a dyn Executor) -> Self {
        Self { name, executor }
    }

    /// Determine the resource state from a pre-fetched set of installed package names.
    #[must_use]
    pub fn state_from_installed(&self, installed: &HashSet<String>) -> ResourceState {
        if installed.contains(&self.name) {
            ResourceState::Correct
        } else {
            ResourceState::Missing
        }
    }
}

/// Query the set of fully installed packages with one `dpkg-query` call.
///
/// Packages that are only configured, half-installed or removed with
/// config files left behind are not counted.
///
/// # Errors
///
/// Returns an error if `dpkg-query` cannot be spawned.
pub fn get_installed_packages(executor: &dyn Executor) -> Result<HashSet<String>> {
    let result = executor.run_unchecked("dpkg-query", &["-W", "-f=${Package} ${Status}\n"])?;
    let mut set = HashSet::new();
    if result.success {
        for line in result.stdout.lines() {
            if let Some((name, status)) = line.split_once(' ')
                && status.trim() == "install ok installed"
            {
                set.insert(name.to_string());
            }
        }
    }
    Ok(set)
}

/// Refresh the package index, then install every resource in one
/// `apt-get install` call.
///
/// # Errors
///
/// Returns an error if `apt-get update` or `apt-get install` fails.
pub fn batch_install_packages(resources: &[&PackageResource<'_>]) -> Result<()> {
    let Some(first) = resources.first() else {
        return Ok(());
    };
    first
        .executor
        .run_with_env("apt-get", &["update", "-q"], APT_ENV)?;

    let mut args = vec!["install", "-y", "-q", "--no-install-recommends"];
    args.extend(resources.iter().map(|r| r.name.as_str()));
    first.executor.run_with_env("apt-get", &args, APT_ENV)?;
    Ok(())
}

impl Applicable for PackageResource<'_> {
    fn description(&self) -> String {
        format!("{} (apt)", self.name)
    }

    fn apply(&self) -> Result<ResourceChange> {
        self.executor.run_with_env(
            "apt-get",
            &["install", "-y", "-q", "--no-install-recommends", &self.name],
            APT_ENV,
        )?;
        Ok(ResourceChange::Applied)
    }
}
