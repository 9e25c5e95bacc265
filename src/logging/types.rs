//! Task entries, status tallies, and the [`Log`] capability.

/// One line of the run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEntry {
    /// Task name as declared in the manifest.
    pub name: String,
    /// How the task ended.
    pub status: TaskStatus,
    /// Version string or error text.
    pub message: Option<String>,
}

/// How a task ended, as shown in the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Detection found the software; nothing was installed.
    AlreadyInstalled,
    /// Installed during this run and confirmed by a probe.
    Installed,
    /// Detection found nothing (`check` only).
    Missing,
    /// Never started: pre-flight failed, an earlier task failed, or the run
    /// was cancelled.
    NotAttempted,
    /// Detection, an install step, the custom action, or version
    /// resolution failed.
    Failed,
}

impl TaskStatus {
    /// Single-character marker used in the summary.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::Installed => '✓',
            Self::AlreadyInstalled => '=',
            Self::Missing => '○',
            Self::NotAttempted => '·',
            Self::Failed => '✗',
        }
    }

    /// ANSI colour for the summary line.
    pub(super) const fn color(self) -> &'static str {
        match self {
            Self::Installed => "\x1b[32m",
            Self::AlreadyInstalled => "\x1b[2m",
            Self::Missing => "\x1b[33m",
            Self::NotAttempted => "\x1b[37m",
            Self::Failed => "\x1b[31m",
        }
    }
}

/// Per-status counts over a set of [`TaskEntry`] values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Tasks installed during the run.
    pub installed: usize,
    /// Tasks whose software was already present.
    pub already_installed: usize,
    /// Tasks detected as missing.
    pub missing: usize,
    /// Tasks that never started.
    pub not_attempted: usize,
    /// Tasks that failed.
    pub failed: usize,
}

impl Summary {
    /// Tally `entries` by status.
    #[must_use]
    pub fn tally(entries: &[TaskEntry]) -> Self {
        entries.iter().fold(Self::default(), |mut acc, entry| {
            match entry.status {
                TaskStatus::Installed => acc.installed += 1,
                TaskStatus::AlreadyInstalled => acc.already_installed += 1,
                TaskStatus::Missing => acc.missing += 1,
                TaskStatus::NotAttempted => acc.not_attempted += 1,
                TaskStatus::Failed => acc.failed += 1,
            }
            acc
        })
    }

    /// Number of tasks counted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.installed + self.already_installed + self.missing + self.not_attempted + self.failed
    }

    /// `true` when every task is installed or already present.
    #[must_use]
    pub const fn all_present(&self) -> bool {
        self.missing == 0 && self.not_attempted == 0 && self.failed == 0
    }
}

/// Logging capability handed to the engine and orchestrator.
///
/// Calls are fire-and-forget; nothing a logger does can change an outcome.
pub trait Log: Send + Sync {
    /// Section header.
    fn stage(&self, msg: &str);
    /// Informational message.
    fn info(&self, msg: &str);
    /// Something completed successfully.
    fn success(&self, msg: &str);
    /// Diagnostic detail; file only unless verbose.
    fn debug(&self, msg: &str);
    /// Recoverable problem.
    fn warn(&self, msg: &str);
    /// Failure.
    fn error(&self, msg: &str);
    /// A side effect that a dry run suppressed.
    fn dry_run(&self, msg: &str);
    /// Add a line to the run summary.
    fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>);
}
