//! Named, dependency-ordered provisioning steps.
pub mod boot;
pub mod compositor;
pub mod graph;
pub mod groups;
pub mod packages;
mod processing;
pub mod scripts;
pub mod session;
pub mod systemd;

/// Implement [`Task::dependencies`] from a list of task types.
///
/// The `const` gives the slice the `'static` lifetime the return type
/// needs; [`std::any::TypeId::of`] is a `const fn`.
///
/// ```ignore
/// task_deps![super::packages::InstallPackages]
/// ```
macro_rules! task_deps {
    [$($dep:ty),+ $(,)?] => {
        fn dependencies(&self) -> &[std::any::TypeId] {
            const DEPS: &[std::any::TypeId] = &[$(std::any::TypeId::of::<$dep>()),+];
            DEPS
        }
    };
}

pub(crate) use task_deps;

pub use processing::Context;
pub use processing::{
    ProcessOpts, TaskResult, finish, process_resource_states, process_resources,
};

use std::any::TypeId;

use anyhow::Result;

use crate::logging::{TaskEntry, TaskStatus};

/// A named, executable task.
///
/// The `'static` bound gives each task struct a stable [`TypeId`], which is
/// how dependencies are declared (see [`Task::dependencies`]).
pub trait Task: Send + Sync + 'static {
    /// Human-readable task name, also matched by `--skip` and `--only`.
    fn name(&self) -> &str;

    /// The concrete `TypeId` of this task, used as a dependency identifier.
    fn task_id(&self) -> TypeId {
        TypeId::of::<Self>()
    }

    /// Tasks that must complete before this task starts.
    ///
    /// Dependencies on tasks that were filtered out of the run are ignored.
    fn dependencies(&self) -> &[TypeId] {
        &[]
    }

    /// Whether this task applies to the current run.
    fn should_run(&self, ctx: &Context) -> bool;

    /// Execute the task.
    ///
    /// # Errors
    ///
    /// Returns an error if a strict resource cannot be applied or a system
    /// command fails.
    fn run(&self, ctx: &Context) -> Result<TaskResult>;
}

/// Every provisioning task, in the order a sequential run executes them.
///
/// The parallel scheduler only uses each task's
/// [`dependencies`](Task::dependencies).
#[must_use]
pub fn all_install_tasks() -> Vec<Box<dyn Task>> {
    vec![
        Box::new(packages::InstallPackages),
        Box::new(groups::ConfigureUserGroups),
        Box::new(compositor::WriteCompositorConfig),
        Box::new(session::WriteSessionLauncher),
        Box::new(session::ConfigureProfileFallback),
        Box::new(boot::PatchBootConfig),
        Box::new(session::ConfigureConsoleAutologin),
        Box::new(scripts::WriteHelperScripts),
        Box::new(scripts::WriteBrowserLauncher),
        Box::new(systemd::WriteSystemdUnits),
        Box::new(systemd::EnableKioskServices),
    ]
}

/// Execute a task, recording the result in the logger.
pub fn execute(task: &dyn Task, ctx: &Context) {
    if !task.should_run(ctx) {
        ctx.log
            .debug(&format!("skipping task: {} (not applicable)", task.name()));
        ctx.log
            .record_task(TaskEntry::new(task.name(), TaskStatus::NotApplicable, None));
        return;
    }

    ctx.log.stage(task.name());

    match task.run(ctx) {
        Ok(TaskResult::Ok(counts)) => {
            ctx.log
                .record_task(TaskEntry::with_counts(task.name(), TaskStatus::Ok, counts));
        }
        Ok(TaskResult::Skipped(reason)) => {
            ctx.log.info(&format!("skipped: {reason}"));
            ctx.log
                .record_task(TaskEntry::new(task.name(), TaskStatus::Skipped, Some(&reason)));
        }
        Ok(TaskResult::DryRun(counts)) => {
            ctx.log
                .record_task(TaskEntry::with_counts(task.name(), TaskStatus::DryRun, counts));
        }
        Err(e) => {
            let chain = format!("{e:#}");
            ctx.log.error(&format!("{}: {chain}", task.name()));
            ctx.log
                .record_task(TaskEntry::new(task.name(), TaskStatus::Failed, Some(&chain)));
        }
    }
}
