//! The [`Logger`]: tracing-backed [`Log`] with a run summary.
use std::path::PathBuf;
use std::sync::Mutex;

use super::subscriber::{DRY_RUN_TARGET, STAGE_TARGET, SUCCESS_TARGET};
use super::types::{Log, Summary, TaskEntry, TaskStatus};
use super::utils::{console_width, fit, log_file_path};

/// Emits through [`tracing`] and collects one [`TaskEntry`] per task for the
/// closing summary.
///
/// The log file itself is written by the subscriber's file layer; the
/// logger only remembers its path to point at it after the summary.
#[derive(Debug)]
pub struct Logger {
    entries: Mutex<Vec<TaskEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Logger for `command`, pointing at that command's log file.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self::with_log_file(log_file_path(command))
    }

    /// Logger that mentions `log_file` (if any) after the summary.
    #[must_use]
    pub const fn with_log_file(log_file: Option<PathBuf>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            log_file,
        }
    }

    /// Path of the log file, if there is one.
    #[must_use]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Recorded entries, in recording order.
    #[must_use]
    pub fn task_entries(&self) -> Vec<TaskEntry> {
        self.entries.lock().map_or_else(|_| Vec::new(), |g| g.clone())
    }

    /// Counts by status over the recorded entries.
    #[must_use]
    pub fn summary(&self) -> Summary {
        self.entries
            .lock()
            .map_or_else(|_| Summary::default(), |g| Summary::tally(&g))
    }

    /// Number of entries recorded as [`TaskStatus::Failed`].
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.summary().failed
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header.
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a success message.
    pub fn success(&self, msg: &str) {
        tracing::info!(target: SUCCESS_TARGET, "{msg}");
    }

    /// Log a debug message.
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a suppressed side effect.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    /// Add a summary entry.
    pub fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(TaskEntry {
                name: name.to_string(),
                status,
                message: message.map(str::to_string),
            });
        }
    }

    /// Log the summary table, the totals line, and the log file location.
    pub fn print_summary(&self) {
        let entries = self.task_entries();
        if entries.is_empty() {
            return;
        }
        self.stage("Summary");
        for line in render_summary(&entries, console_width().saturating_sub(4)) {
            self.info(&line);
        }
        self.info(&totals_line(&Summary::tally(&entries)));
        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

/// One coloured line per entry: glyph, name padded to the longest name, then
/// the message, cut to `width` visible characters.
#[must_use]
pub fn render_summary(entries: &[TaskEntry], width: usize) -> Vec<String> {
    let name_width = entries
        .iter()
        .map(|e| e.name.chars().count())
        .max()
        .unwrap_or(0);
    entries
        .iter()
        .map(|entry| {
            let text = entry.message.as_deref().map_or_else(
                || format!("{} {}", entry.status.glyph(), entry.name),
                |msg| format!("{} {:<name_width$}  {msg}", entry.status.glyph(), entry.name),
            );
            format!("{}{}\x1b[0m", entry.status.color(), fit(&text, width))
        })
        .collect()
}

fn totals_line(summary: &Summary) -> String {
    let mut parts = vec![
        format!("\x1b[32m{} installed\x1b[0m", summary.installed),
        format!("\x1b[2m{} already installed\x1b[0m", summary.already_installed),
    ];
    if summary.missing > 0 {
        parts.push(format!("\x1b[33m{} missing\x1b[0m", summary.missing));
    }
    if summary.not_attempted > 0 {
        parts.push(format!("\x1b[37m{} not attempted\x1b[0m", summary.not_attempted));
    }
    if summary.failed > 0 {
        parts.push(format!("\x1b[31m{} failed\x1b[0m", summary.failed));
    }
    format!("{} tasks: {}", summary.total(), parts.join(", "))
}

impl Log for Logger {
    fn stage(&self, msg: &str) {
        Self::stage(self, msg);
    }

    fn info(&self, msg: &str) {
        Self::info(self, msg);
    }

    fn success(&self, msg: &str) {
        Self::success(self, msg);
    }

    fn debug(&self, msg: &str) {
        Self::debug(self, msg);
    }

    fn warn(&self, msg: &str) {
        Self::warn(self, msg);
    }

    fn error(&self, msg: &str) {
        Self::error(self, msg);
    }

    fn dry_run(&self, msg: &str) {
        Self::dry_run(self, msg);
    }

    fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>) {
        Self::record_task(self, name, status, message);
    }
}
