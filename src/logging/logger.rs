//! The run's logger: emits through `tracing` and keeps the task summary.
use std::path::PathBuf;
use std::sync::Mutex;

use super::subscriber::{DRY_RUN_TARGET, STAGE_TARGET};
use super::types::{ChangeCounts, Log, TaskEntry, TaskStatus};
use super::utils::log_file_path;

/// Implement the display methods of [`Log`] by delegating to the inherent
/// methods of the same name.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Logger shared by every task of a run.
///
/// Events go to the console and to `$XDG_CACHE_HOME/kiosk-setup/<command>.log`
/// through the subscriber installed by
/// [`init_subscriber`](super::subscriber::init_subscriber).
#[derive(Debug)]
pub struct Logger {
    tasks: Mutex<Vec<TaskEntry>>,
    log_file: Option<PathBuf>,
    /// Held while a parallel task replays its buffered output.
    pub(super) flush_lock: Mutex<()>,
}

impl Logger {
    /// Create a logger for `command`; the log file itself is opened by the
    /// subscriber.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
            log_file: log_file_path(command),
            flush_lock: Mutex::new(()),
        }
    }

    /// Log file path, if the cache directory was usable.
    #[cfg(test)]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn task_entries(&self) -> Vec<TaskEntry> {
        self.tasks.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a task header.
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message.
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a change held back by `--dry-run`.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    /// Add a task outcome to the summary.
    pub fn record_task(&self, entry: TaskEntry) {
        if let Ok(mut guard) = self.tasks.lock() {
            guard.push(entry);
        }
    }

    /// Number of failed tasks.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.tasks.lock().map_or(0, |guard| {
            guard
                .iter()
                .filter(|t| t.status == TaskStatus::Failed)
                .count()
        })
    }

    /// Print one line per task, then the run totals and the log file path.
    pub fn print_summary(&self) {
        let tasks = match self.tasks.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => return,
        };
        if tasks.is_empty() {
            return;
        }

        println!();
        self.stage("Summary");
        for task in &tasks {
            let color = match task.status {
                TaskStatus::Ok => "\x1b[32m",
                TaskStatus::NotApplicable => "\x1b[2m",
                TaskStatus::Skipped | TaskStatus::DryRun => "\x1b[33m",
                TaskStatus::Failed => "\x1b[31m",
            };
            self.info(&format!("{color}{}\x1b[0m", task_line(task)));
        }
        println!();
        self.info(&totals_line(&tasks));

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

/// `"✓ Write systemd units: 1 changed, 4 already ok"`.
fn task_line(task: &TaskEntry) -> String {
    let icon = match task.status {
        TaskStatus::Ok => "✓",
        TaskStatus::NotApplicable => "·",
        TaskStatus::Skipped => "○",
        TaskStatus::DryRun => "~",
        TaskStatus::Failed => "✗",
    };
    let detail = match (&task.message, task.counts) {
        (Some(msg), _) => format!(" ({msg})"),
        (None, Some(counts)) if !counts.is_empty() => {
            format!(": {}", counts.describe(task.status == TaskStatus::DryRun))
        }
        _ => String::new(),
    };
    format!("{icon} {}{detail}", task.name)
}

/// Task tally plus the resource counts summed over every task.
fn totals_line(tasks: &[TaskEntry]) -> String {
    let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();
    let mut resources = ChangeCounts::default();
    for counts in tasks.iter().filter_map(|t| t.counts) {
        resources += counts;
    }
    let dry_run = tasks.iter().any(|t| t.status == TaskStatus::DryRun);
    let mut line = format!(
        "{} tasks: {} ok, {} n/a, {} skipped, {} failed",
        tasks.len(),
        count(TaskStatus::Ok) + count(TaskStatus::DryRun),
        count(TaskStatus::NotApplicable),
        count(TaskStatus::Skipped),
        count(TaskStatus::Failed),
    );
    if !resources.is_empty() {
        line.push_str("; resources: ");
        line.push_str(&resources.describe(dry_run));
    }
    line
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error, dry_run);

    fn record_task(&self, entry: TaskEntry) {
        self.record_task(entry);
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::isolated_logger;
    use std::fs;

    fn counts(changed: u32, already_ok: u32) -> ChangeCounts {
        ChangeCounts {
            changed,
            already_ok,
            skipped: 0,
        }
    }

    #[test]
    fn records_entries_in_order() {
        let (log, _tmp, _guard) = isolated_logger();
        assert!(log.task_entries().is_empty());
        log.record_task(TaskEntry::with_counts(
            "Write systemd units",
            TaskStatus::Ok,
            counts(1, 4),
        ));
        log.record_task(TaskEntry::new(
            "Patch boot config",
            TaskStatus::Skipped,
            Some("/boot/firmware/config.txt not found"),
        ));
        let entries = log.task_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].counts, Some(counts(1, 4)));
        assert_eq!(entries[1].status, TaskStatus::Skipped);
    }

    #[test]
    fn failure_count_only_counts_failed() {
        let (log, _tmp, _guard) = isolated_logger();
        assert_eq!(log.failure_count(), 0);
        log.record_task(TaskEntry::new("a", TaskStatus::Ok, None));
        log.record_task(TaskEntry::new("b", TaskStatus::Failed, Some("error 1")));
        log.record_task(TaskEntry::new("c", TaskStatus::Failed, Some("error 2")));
        log.record_task(TaskEntry::new("d", TaskStatus::NotApplicable, None));
        assert_eq!(log.failure_count(), 2);
    }

    #[test]
    fn task_line_shows_counts_or_message() {
        let ok = TaskEntry::with_counts("Write systemd units", TaskStatus::Ok, counts(1, 4));
        assert_eq!(task_line(&ok), "✓ Write systemd units: 1 changed, 4 already ok");

        let dry = TaskEntry::with_counts("Patch boot config", TaskStatus::DryRun, counts(2, 0));
        assert_eq!(task_line(&dry), "~ Patch boot config: 2 would change, 0 already ok");

        let failed = TaskEntry::new("Install packages", TaskStatus::Failed, Some("apt-get failed"));
        assert_eq!(task_line(&failed), "✗ Install packages (apt-get failed)");

        let na = TaskEntry::new("Enable kiosk services", TaskStatus::NotApplicable, None);
        assert_eq!(task_line(&na), "· Enable kiosk services");
    }

    #[test]
    fn totals_sum_resources_over_tasks() {
        let tasks = [
            TaskEntry::with_counts("Write compositor config", TaskStatus::Ok, counts(3, 0)),
            TaskEntry::with_counts("Write systemd units", TaskStatus::Ok, counts(1, 4)),
            TaskEntry::new("Enable kiosk services", TaskStatus::NotApplicable, None),
        ];
        assert_eq!(
            totals_line(&tasks),
            "3 tasks: 2 ok, 1 n/a, 0 skipped, 0 failed; resources: 4 changed, 4 already ok"
        );
    }

    #[test]
    fn totals_without_resources_omit_counts() {
        let tasks = [TaskEntry::new("Install packages", TaskStatus::Failed, Some("x"))];
        assert_eq!(totals_line(&tasks), "1 tasks: 0 ok, 0 n/a, 0 skipped, 1 failed");
    }

    #[test]
    fn debug_always_written_to_file() {
        let (log, _tmp, _guard) = isolated_logger();
        let marker = format!("debug-marker-{}", std::process::id());
        log.debug(&marker);
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        assert!(contents.contains(&marker));
    }

    #[test]
    fn every_level_reaches_file_with_its_tag() {
        let (log, _tmp, _guard) = isolated_logger();
        let pid = std::process::id();
        log.stage(&format!("stage-{pid}"));
        log.info(&format!("info-{pid}"));
        log.warn(&format!("warn-{pid}"));
        log.error(&format!("error-{pid}"));
        log.dry_run(&format!("dry-{pid}"));
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        assert!(contents.contains(&format!("==> stage-{pid}")));
        assert!(contents.contains(&format!("     info-{pid}")));
        assert!(contents.contains(&format!("[warn] warn-{pid}")));
        assert!(contents.contains(&format!("[error] error-{pid}")));
        assert!(contents.contains(&format!("[dry run] dry-{pid}")));
    }

    #[test]
    fn log_trait_delegates_to_logger() {
        let (log, _tmp, _guard) = isolated_logger();
        let log_ref: &dyn Log = &log;
        log_ref.record_task(TaskEntry::new("via-trait", TaskStatus::Ok, None));
        assert_eq!(log.task_entries().len(), 1);
    }
}
