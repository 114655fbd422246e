//! Generic resource processing loop: check state, apply, collect counts.

mod apply;
pub mod context;
mod parallel;

pub use context::Context;

use anyhow::Result;

use crate::logging::ChangeCounts;
use crate::resources::{Applicable, Resource, ResourceState};

/// Result of a single task execution.
///
/// # Examples
///
/// ```
/// use kiosk_cli::logging::ChangeCounts;
/// use kiosk_cli::tasks::TaskResult;
///
/// let written = ChangeCounts { changed: 2, already_ok: 1, skipped: 0 };
/// let merged = TaskResult::Ok(written).merge(TaskResult::DryRun(ChangeCounts::default()));
/// assert!(matches!(merged, TaskResult::DryRun(c) if c.changed == 2));
/// ```
#[derive(Debug, Clone)]
pub enum TaskResult {
    /// Task completed; the counts say what it touched.
    Ok(ChangeCounts),
    /// Task had nothing it could do (e.g. no boot partition found).
    Skipped(String),
    /// Task ran in dry-run mode.
    DryRun(ChangeCounts),
}

impl TaskResult {
    /// Resource counts, if the task reached its resources.
    #[must_use]
    pub const fn counts(&self) -> Option<ChangeCounts> {
        match self {
            Self::Ok(counts) | Self::DryRun(counts) => Some(*counts),
            Self::Skipped(_) => None,
        }
    }

    /// Combine the results of two resource batches run by one task.
    ///
    /// Counts add up; a dry run on either side makes the whole a dry run,
    /// and a skip only stands when both sides skipped.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::Skipped(reason), Self::Skipped(_)) => Self::Skipped(reason),
            (Self::Skipped(_), done) | (done, Self::Skipped(_)) => done,
            (Self::Ok(mut a), Self::Ok(b)) => {
                a += b;
                Self::Ok(a)
            }
            (Self::Ok(mut a) | Self::DryRun(mut a), Self::Ok(b) | Self::DryRun(b)) => {
                a += b;
                Self::DryRun(a)
            }
        }
    }
}

/// Log the counts and wrap them in the result matching the run mode.
#[must_use]
pub fn finish(ctx: &Context, counts: ChangeCounts) -> TaskResult {
    ctx.log.info(&counts.describe(ctx.dry_run));
    if ctx.dry_run {
        TaskResult::DryRun(counts)
    } else {
        TaskResult::Ok(counts)
    }
}

/// How the processing loop treats each [`ResourceState`].
///
/// # Examples
///
/// ```
/// use kiosk_cli::tasks::ProcessOpts;
///
/// let strict = ProcessOpts::apply_all("write");
/// assert!(strict.fix_incorrect && strict.fix_missing && strict.bail_on_error);
///
/// let lenient = ProcessOpts::apply_all("enable").no_bail();
/// assert!(!lenient.bail_on_error);
/// ```
#[derive(Debug)]
pub struct ProcessOpts<'a> {
    /// Verb for log messages (e.g. "write", "install", "enable").
    pub verb: &'a str,
    /// Apply `Incorrect` resources. If `false`, skip them.
    pub fix_incorrect: bool,
    /// Apply `Missing` resources. If `false`, skip them.
    pub fix_missing: bool,
    /// Propagate `apply()` errors. If `false`, warn and count as skipped.
    pub bail_on_error: bool,
}

impl<'a> ProcessOpts<'a> {
    /// Fix missing and incorrect resources, failing the task on the first
    /// error.
    #[must_use]
    pub const fn apply_all(verb: &'a str) -> Self {
        Self {
            verb,
            fix_incorrect: true,
            fix_missing: true,
            bail_on_error: true,
        }
    }

    /// Warn on errors instead of failing the task.
    #[must_use]
    pub const fn no_bail(mut self) -> Self {
        self.bail_on_error = false;
        self
    }
}

/// Check each resource's state and apply the ones that drifted.
///
/// # Errors
///
/// Returns an error if a state check fails, or if applying fails and
/// `opts.bail_on_error` is set.
pub fn process_resources<R: Resource + Send>(
    ctx: &Context,
    resources: impl IntoIterator<Item = R>,
    opts: &ProcessOpts,
) -> Result<TaskResult> {
    let resources: Vec<R> = resources.into_iter().collect();
    if ctx.parallel && resources.len() > 1 {
        ctx.log.debug(&format!(
            "processing {} resources in parallel",
            resources.len()
        ));
        parallel::process_resources_parallel(ctx, resources, opts)
    } else {
        let mut counts = ChangeCounts::default();
        for resource in resources {
            let current = resource.current_state()?;
            counts += apply::process_single(ctx, &resource, current, opts)?;
        }
        Ok(finish(ctx, counts))
    }
}

/// Process resources whose states were computed up front (e.g. from one
/// `dpkg-query` call).
///
/// # Errors
///
/// Returns an error if applying fails and `opts.bail_on_error` is set.
pub fn process_resource_states<R: Applicable + Send>(
    ctx: &Context,
    resource_states: impl IntoIterator<Item = (R, ResourceState)>,
    opts: &ProcessOpts,
) -> Result<TaskResult> {
    let resource_states: Vec<(R, ResourceState)> = resource_states.into_iter().collect();
    if ctx.parallel && resource_states.len() > 1 {
        ctx.log.debug(&format!(
            "processing {} resources in parallel",
            resource_states.len()
        ));
        parallel::process_resource_states_parallel(ctx, resource_states, opts)
    } else {
        let mut counts = ChangeCounts::default();
        for (resource, current) in resource_states {
            counts += apply::process_single(ctx, &resource, current, opts)?;
        }
        Ok(finish(ctx, counts))
    }
}
