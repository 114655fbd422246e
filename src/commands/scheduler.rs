//! Dependency-driven parallel execution of install tasks.

use std::any::TypeId;
use std::collections::HashSet;
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use crate::logging::{BufferedLog, Log, Logger};
use crate::tasks::{self, Context, Task};

/// Completed tasks, shared between the task threads.
///
/// A task calls [`wait_for`](Completions::wait_for) before it starts and
/// [`mark_done`](Completions::mark_done) when it finishes, whatever its
/// outcome.
#[derive(Debug, Default)]
struct Completions {
    done: Mutex<HashSet<TypeId>>,
    changed: Condvar,
}

impl Completions {
    /// Block until every task in `deps` has finished.
    fn wait_for(&self, deps: &[TypeId]) {
        let mut done = self.done.lock().unwrap_or_else(PoisonError::into_inner);
        while !deps.iter().all(|d| done.contains(d)) {
            done = self
                .changed
                .wait(done)
                .unwrap_or_else(PoisonError::into_inner);
        }
        drop(done);
    }

    fn mark_done(&self, id: TypeId) {
        self.done
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        self.changed.notify_all();
    }
}

/// Run `tasks` concurrently, each on its own scoped OS thread, starting a
/// task once the dependencies present in `tasks` have finished.
///
/// Threads block on a [`Condvar`], so they are not rayon workers: a small
/// rayon pool full of waiting tasks would never make progress. Each task
/// logs into a [`BufferedLog`] that is replayed when it finishes.
pub(super) fn run_tasks_parallel(tasks: &[&dyn Task], ctx: &Context, log: &Arc<Logger>) {
    let present: HashSet<TypeId> = tasks.iter().map(|t| t.task_id()).collect();
    let completions = Completions::default();

    std::thread::scope(|s| {
        for &task in tasks {
            let deps: Vec<TypeId> = task
                .dependencies()
                .iter()
                .filter(|d| present.contains(d))
                .copied()
                .collect();
            let completions = &completions;
            s.spawn(move || {
                completions.wait_for(&deps);
                log.debug(&format!("started: {}", task.name()));

                let buf = Arc::new(BufferedLog::new(Arc::clone(log)));
                let task_ctx = ctx.with_log(Arc::clone(&buf) as Arc<dyn Log>);
                tasks::execute(task, &task_ctx);

                buf.flush();
                completions.mark_done(task.task_id());
            });
        }
    });
}
