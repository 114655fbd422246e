//! Task dependency graph checks.

use std::any::TypeId;
use std::collections::HashMap;

use super::Task;

/// Whether the dependency graph of `tasks` contains a cycle (Kahn's
/// algorithm). Dependencies on tasks outside `tasks` are ignored.
#[must_use]
pub fn has_cycle(tasks: &[&dyn Task]) -> bool {
    let index: HashMap<TypeId, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.task_id(), i))
        .collect();

    let mut pending: Vec<usize> = tasks
        .iter()
        .map(|t| {
            t.dependencies()
                .iter()
                .filter(|d| index.contains_key(d))
                .count()
        })
        .collect();

    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); tasks.len()];
    for (i, t) in tasks.iter().enumerate() {
        for dep in t.dependencies() {
            if let Some(&d) = index.get(dep)
                && let Some(list) = dependents.get_mut(d)
            {
                list.push(i);
            }
        }
    }

    let mut ready: Vec<usize> = pending
        .iter()
        .enumerate()
        .filter_map(|(i, &n)| (n == 0).then_some(i))
        .collect();
    let mut visited = 0usize;

    while let Some(idx) = ready.pop() {
        visited += 1;
        for &next in dependents.get(idx).into_iter().flatten() {
            if let Some(count) = pending.get_mut(next) {
                *count -= 1;
                if *count == 0 {
                    ready.push(next);
                }
            }
        }
    }

    visited != tasks.len()
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::tasks::{Context, TaskResult};

    use anyhow::Result;

    macro_rules! stub_task {
        ($name:ident, $deps:expr) => {
            struct $name;
            impl Task for $name {
                fn name(&self) -> &str {
                    stringify!($name)
                }
                fn dependencies(&self) -> &[TypeId] {
                    const DEPS: &[TypeId] = $deps;
                    DEPS
                }
                fn should_run(&self, _ctx: &Context) -> bool {
                    true
                }
                fn run(&self, _ctx: &Context) -> Result<TaskResult> {
                    Ok(TaskResult::Ok(Default::default()))
                }
            }
        };
    }

    stub_task!(Packages, &[]);
    stub_task!(Groups, &[TypeId::of::<Packages>()]);
    stub_task!(Units, &[]);
    stub_task!(Enable, &[TypeId::of::<Units>(), TypeId::of::<Groups>()]);

    stub_task!(Left, &[TypeId::of::<Right>()]);
    stub_task!(Right, &[TypeId::of::<Left>()]);

    #[test]
    fn independent_tasks_have_no_cycle() {
        let tasks: Vec<&dyn Task> = vec![&Packages, &Units];
        assert!(!has_cycle(&tasks));
    }

    #[test]
    fn join_of_two_chains_has_no_cycle() {
        let tasks: Vec<&dyn Task> = vec![&Enable, &Groups, &Units, &Packages];
        assert!(!has_cycle(&tasks));
    }

    #[test]
    fn mutual_dependency_is_a_cycle() {
        let tasks: Vec<&dyn Task> = vec![&Left, &Right, &Units];
        assert!(has_cycle(&tasks));
    }

    #[test]
    fn filtered_out_dependency_is_ignored() {
        let tasks: Vec<&dyn Task> = vec![&Enable, &Units];
        assert!(!has_cycle(&tasks));
    }

    #[test]
    fn install_tasks_have_no_cycles() {
        let tasks = crate::tasks::all_install_tasks();
        let refs: Vec<&dyn Task> = tasks.iter().map(Box::as_ref).collect();
        assert!(!has_cycle(&refs));
    }

    #[test]
    fn sequential_order_satisfies_dependencies() {
        let tasks = crate::tasks::all_install_tasks();
        let position: HashMap<TypeId, usize> = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.task_id(), i))
            .collect();
        for (i, task) in tasks.iter().enumerate() {
            for dep in task.dependencies() {
                let at = position
                    .get(dep)
                    .unwrap_or_else(|| panic!("{} depends on an unknown task", task.name()));
                assert!(*at < i, "{} runs before its dependency", task.name());
            }
        }
    }
}
