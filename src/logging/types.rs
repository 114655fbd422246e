//! What a provisioning run reports: per-task outcomes and resource counts.

/// Resource counts for one task, or summed over a run.
///
/// # Examples
///
/// ```
/// use kiosk_cli::logging::ChangeCounts;
///
/// let counts = ChangeCounts { changed: 1, already_ok: 2, skipped: 3 };
/// assert_eq!(counts.describe(false), "1 changed, 2 already ok, 3 skipped");
/// assert_eq!(counts.describe(true), "1 would change, 2 already ok, 3 skipped");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeCounts {
    /// Resources changed (or that would change in a dry run).
    pub changed: u32,
    /// Resources already in the desired state.
    pub already_ok: u32,
    /// Resources left alone: invalid, or failed under a lenient task.
    pub skipped: u32,
}

impl ChangeCounts {
    /// Whether no resource was looked at.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.changed == 0 && self.already_ok == 0 && self.skipped == 0
    }

    /// `"3 changed, 10 already ok"`, with a skipped count only when non-zero.
    #[must_use]
    pub fn describe(&self, dry_run: bool) -> String {
        let verb = if dry_run { "would change" } else { "changed" };
        if self.skipped > 0 {
            format!(
                "{} {verb}, {} already ok, {} skipped",
                self.changed, self.already_ok, self.skipped
            )
        } else {
            format!("{} {verb}, {} already ok", self.changed, self.already_ok)
        }
    }
}

impl std::ops::AddAssign for ChangeCounts {
    fn add_assign(&mut self, other: Self) {
        self.changed += other.changed;
        self.already_ok += other.already_ok;
        self.skipped += other.skipped;
    }
}

/// Outcome of one install task, as listed in the run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEntry {
    /// Task name, e.g. "Patch boot config".
    pub name: String,
    /// Final status.
    pub status: TaskStatus,
    /// Skip reason or error chain.
    pub message: Option<String>,
    /// Resource counts for tasks that reached their resources.
    pub counts: Option<ChangeCounts>,
}

impl TaskEntry {
    /// An entry without counts.
    #[must_use]
    pub fn new(name: &str, status: TaskStatus, message: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.map(String::from),
            counts: None,
        }
    }

    /// An entry for a task that processed resources.
    #[must_use]
    pub fn with_counts(name: &str, status: TaskStatus, counts: ChangeCounts) -> Self {
        Self {
            counts: Some(counts),
            ..Self::new(name, status, None)
        }
    }
}

/// Status of a completed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Ran to completion.
    Ok,
    /// Host commands under an image `--root`, or no `systemctl`.
    NotApplicable,
    /// Nothing to act on, e.g. no boot partition.
    Skipped,
    /// Ran under `--dry-run`.
    DryRun,
    /// Returned an error.
    Failed,
}

/// Where tasks send their output.
///
/// [`Logger`](super::logger::Logger) emits straight away;
/// [`BufferedLog`](super::buffered::BufferedLog) holds a parallel task's
/// output until it finishes.
pub trait Log: Send + Sync {
    /// Task header.
    fn stage(&self, msg: &str);
    /// Progress worth showing by default.
    fn info(&self, msg: &str);
    /// Console only with `--verbose`; always in the log file.
    fn debug(&self, msg: &str);
    /// Problem the run continues past.
    fn warn(&self, msg: &str);
    /// Task failure.
    fn error(&self, msg: &str);
    /// A change that `--dry-run` held back.
    fn dry_run(&self, msg: &str);
    /// Add a task outcome to the run summary.
    fn record_task(&self, entry: TaskEntry);
}
