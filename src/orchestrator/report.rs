//! Aggregated result of one orchestration run.
use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context as _, Result};
use serde::{Serialize, Serializer};

use super::FailurePolicy;
use crate::error::{InstallError, PostflightError, PreflightError, RunError};
use crate::install::Outcome;

/// Why a run stopped before every task was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cancellation {
    /// The run's time budget was exhausted.
    Timeout,
    /// The user interrupted the run (Ctrl-C).
    Interrupted,
}

impl fmt::Display for Cancellation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout exceeded"),
            Self::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Outcome of one attempted task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskReport {
    /// Task name.
    pub name: String,
    /// Engine outcome.
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Finalized, read-only record of a run.
///
/// Task entries appear in execution order. Tasks never started are listed
/// separately in [`RunReport::not_attempted`].
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    success: bool,
    policy: FailurePolicy,
    #[serde(serialize_with = "as_secs")]
    elapsed: Duration,
    tasks: Vec<TaskReport>,
    not_attempted: Vec<String>,
    #[serde(serialize_with = "as_display_opt")]
    preflight_error: Option<PreflightError>,
    #[serde(serialize_with = "as_display_vec")]
    postflight_errors: Vec<PostflightError>,
    cancelled: Option<Cancellation>,
}

impl RunReport {
    /// True iff pre-flight passed, no task failed, and the run was not cut
    /// short.  Post-flight findings do not affect this.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.success
    }

    /// Policy the run was executed under.
    #[must_use]
    pub const fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Wall-clock duration of the run.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Attempted tasks in execution order.
    #[must_use]
    pub fn tasks(&self) -> &[TaskReport] {
        &self.tasks
    }

    /// Outcome recorded for `name`, if the task was attempted.
    #[must_use]
    pub fn outcome(&self, name: &str) -> Option<&Outcome> {
        self.tasks
            .iter()
            .find(|t| t.name == name)
            .map(|t| &t.outcome)
    }

    /// Names of tasks that were never started.
    #[must_use]
    pub fn not_attempted(&self) -> &[String] {
        &self.not_attempted
    }

    /// The pre-flight failure that aborted the run, if any.
    #[must_use]
    pub const fn preflight_error(&self) -> Option<&PreflightError> {
        self.preflight_error.as_ref()
    }

    /// Advisory findings from post-flight verification.
    #[must_use]
    pub fn postflight_errors(&self) -> &[PostflightError] {
        &self.postflight_errors
    }

    /// Why the run was cut short, if it was.
    #[must_use]
    pub const fn cancelled(&self) -> Option<Cancellation> {
        self.cancelled
    }

    /// First failed task and its error, in execution order.
    #[must_use]
    pub fn first_failure(&self) -> Option<(&str, &InstallError)> {
        self.tasks
            .iter()
            .find_map(|t| t.outcome.error().map(|e| (t.name.as_str(), e)))
    }

    /// The first unrecovered error of the run, which determines the exit
    /// status; `None` when the run succeeded.
    #[must_use]
    pub fn error(&self) -> Option<RunError> {
        if let Some(e) = &self.preflight_error {
            return Some(RunError::Preflight(e.clone()));
        }
        if let Some((task, e)) = self.first_failure() {
            return Some(RunError::TaskFailed {
                task: task.to_string(),
                source: e.clone(),
            });
        }
        self.cancelled
            .map(|reason| RunError::Cancelled(reason.to_string()))
    }

    /// Render the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serializing run report")
    }

    /// Write the report as JSON to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("writing report to {}", path.display()))
    }
}

/// Mutable report owned by the orchestrator while a run is in progress.
#[derive(Debug)]
pub(super) struct ReportBuilder {
    policy: FailurePolicy,
    tasks: Vec<TaskReport>,
    not_attempted: Vec<String>,
    preflight_error: Option<PreflightError>,
    postflight_errors: Vec<PostflightError>,
    cancelled: Option<Cancellation>,
}

impl ReportBuilder {
    pub(super) const fn new(policy: FailurePolicy) -> Self {
        Self {
            policy,
            tasks: Vec::new(),
            not_attempted: Vec::new(),
            preflight_error: None,
            postflight_errors: Vec::new(),
            cancelled: None,
        }
    }

    pub(super) fn push(&mut self, name: &str, outcome: Outcome) {
        self.tasks.push(TaskReport {
            name: name.to_string(),
            outcome,
        });
    }

    pub(super) fn skip(&mut self, name: &str) {
        self.not_attempted.push(name.to_string());
    }

    pub(super) fn preflight_failed(&mut self, error: PreflightError) {
        self.preflight_error = Some(error);
    }

    pub(super) fn postflight(&mut self, error: PostflightError) {
        self.postflight_errors.push(error);
    }

    pub(super) const fn cancel(&mut self, reason: Cancellation) {
        self.cancelled = Some(reason);
    }

    pub(super) fn tasks(&self) -> &[TaskReport] {
        &self.tasks
    }

    pub(super) fn finish(self, elapsed: Duration) -> RunReport {
        let success = self.preflight_error.is_none()
            && self.cancelled.is_none()
            && self.tasks.iter().all(|t| t.outcome.is_success());
        RunReport {
            success,
            policy: self.policy,
            elapsed,
            tasks: self.tasks,
            not_attempted: self.not_attempted,
            preflight_error: self.preflight_error,
            postflight_errors: self.postflight_errors,
            cancelled: self.cancelled,
        }
    }
}

fn as_secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

fn as_display_opt<S: Serializer, T: fmt::Display>(v: &Option<T>, s: S) -> Result<S::Ok, S::Error> {
    match v {
        Some(v) => s.collect_str(v),
        None => s.serialize_none(),
    }
}

#[allow(clippy::ptr_arg)]
fn as_display_vec<S: Serializer, T: fmt::Display>(v: &Vec<T>, s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(v.iter().map(ToString::to_string))
}
