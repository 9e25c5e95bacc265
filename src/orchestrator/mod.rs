//! Sequences tasks through the engine with pre-flight and post-flight
//! verification, a failure policy, and a run deadline.
pub mod preflight;
pub mod report;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::validation::check_task_names;
use crate::error::{ConfigError, PostflightError};
use crate::exec::Executor;
use crate::install::{Engine, HostEnv, Outcome, Task};
use crate::logging::{Log, TaskStatus};

pub use preflight::PreflightCheck;
pub use report::{Cancellation, RunReport, TaskReport};
use report::ReportBuilder;

/// What to do after a task fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop at the first failed task; later tasks are not attempted.
    FailFast,
    /// Record the failure and keep going.
    ContinueOnError,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailFast => write!(f, "fail-fast"),
            Self::ContinueOnError => write!(f, "continue-on-error"),
        }
    }
}

/// Runs an ordered task list and produces a [`RunReport`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::path::PathBuf;
/// use workstation_cli::exec::{DryRunExecutor, SystemExecutor};
/// use workstation_cli::install::{HostEnv, Task};
/// use workstation_cli::logging::Logger;
/// use workstation_cli::orchestrator::{FailurePolicy, Orchestrator};
///
/// let executor = Arc::new(DryRunExecutor::new(Arc::new(SystemExecutor)));
/// let log = Arc::new(Logger::with_log_file(None));
/// let env = HostEnv::new(PathBuf::from("/tmp"), None);
/// let tasks = vec![Task::new("Nothing")];
///
/// let mut orchestrator =
///     Orchestrator::new(tasks, FailurePolicy::FailFast, executor, log, env)?;
/// let report = orchestrator.run();
/// assert_eq!(report.tasks().len(), 1);
/// # Ok::<(), workstation_cli::error::ConfigError>(())
/// ```
pub struct Orchestrator {
    tasks: Vec<Task>,
    policy: FailurePolicy,
    engine: Engine,
    log: Arc<dyn Log>,
    preflight: Vec<PreflightCheck>,
    postflight: bool,
    timeout: Option<Duration>,
    interrupt: Option<Arc<AtomicBool>>,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("tasks", &self.tasks.len())
            .field("policy", &self.policy)
            .field("engine", &self.engine)
            .field("log", &"<dyn Log>")
            .field("preflight", &self.preflight)
            .field("postflight", &self.postflight)
            .field("timeout", &self.timeout)
            .field("interrupt", &self.interrupt)
            .finish()
    }
}

impl Orchestrator {
    /// Create an orchestrator with no pre-flight checks, post-flight
    /// verification enabled, and no deadline.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyTaskName`] or
    /// [`ConfigError::DuplicateTask`]; reports and verification identify
    /// tasks by name.
    pub fn new(
        tasks: Vec<Task>,
        policy: FailurePolicy,
        executor: Arc<dyn Executor>,
        log: Arc<dyn Log>,
        env: HostEnv,
    ) -> Result<Self, ConfigError> {
        check_task_names(&tasks)?;
        Ok(Self {
            tasks,
            policy,
            engine: Engine::new(executor, Arc::clone(&log), env),
            log,
            preflight: Vec::new(),
            postflight: true,
            timeout: None,
            interrupt: None,
        })
    }

    /// Checks run before any task; the first failure aborts the run.
    #[must_use]
    pub fn with_preflight(mut self, checks: Vec<PreflightCheck>) -> Self {
        self.preflight = checks;
        self
    }

    /// Enable or disable post-flight verification.
    #[must_use]
    pub const fn with_postflight(mut self, enabled: bool) -> Self {
        self.postflight = enabled;
        self
    }

    /// Budget for the whole run, checked before each task starts.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Flag that, once set, stops the run at the next task boundary.
    #[must_use]
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Tasks in execution order.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Execute the run.
    ///
    /// Never fails: pre-flight errors, task failures, and cancellation are
    /// all recorded in the returned report.
    pub fn run(&mut self) -> RunReport {
        let started = Instant::now();
        let deadline = self.timeout.map(|t| started + t);
        let mut report = ReportBuilder::new(self.policy);

        if !self.preflight.is_empty() {
            self.log.stage("Pre-flight checks");
            for check in &self.preflight {
                let budget = deadline.map(|d| d.saturating_duration_since(Instant::now()));
                if let Err(e) = check.run_within(self.engine.executor(), self.engine.env(), budget) {
                    self.log.error(&e.to_string());
                    report.preflight_failed(e);
                    self.skip_remaining(0, &mut report, "pre-flight failed");
                    return report.finish(started.elapsed());
                }
                self.log.debug(&format!("{check}: ok"));
            }
        }

        let mut cancelled = false;
        for (index, task) in self.tasks.iter().enumerate() {
            if let Some(reason) = self.cancellation(deadline) {
                self.log.warn(&format!("run cancelled: {reason}"));
                report.cancel(reason);
                self.skip_remaining(index, &mut report, &reason.to_string());
                cancelled = true;
                break;
            }

            self.log.stage(task.name());
            let outcome = self.engine.run(task);
            self.record(task.name(), &outcome);
            let failed = !outcome.is_success();
            report.push(task.name(), outcome);

            if failed && self.policy == FailurePolicy::FailFast {
                self.skip_remaining(index + 1, &mut report, "earlier task failed");
                break;
            }
        }

        // The last task may have used up the budget; it keeps its outcome but
        // the run still failed its deadline.
        if !cancelled && deadline.is_some_and(|d| Instant::now() >= d) {
            self.log.warn(&format!("run cancelled: {}", Cancellation::Timeout));
            report.cancel(Cancellation::Timeout);
        }

        if self.postflight && !report.tasks().is_empty() {
            self.verify(&mut report);
        }

        report.finish(started.elapsed())
    }

    fn cancellation(&self, deadline: Option<Instant>) -> Option<Cancellation> {
        if self
            .interrupt
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
        {
            return Some(Cancellation::Interrupted);
        }
        deadline
            .is_some_and(|d| Instant::now() >= d)
            .then_some(Cancellation::Timeout)
    }

    fn skip_remaining(&self, from: usize, report: &mut ReportBuilder, reason: &str) {
        for task in self.tasks.iter().skip(from) {
            report.skip(task.name());
            self.log
                .record_task(task.name(), TaskStatus::NotAttempted, Some(reason));
        }
    }

    fn record(&self, name: &str, outcome: &Outcome) {
        let version = outcome.version().lines().next().filter(|v| !v.is_empty());
        if let Some(e) = outcome.error() {
            self.log
                .record_task(name, TaskStatus::Failed, Some(&e.to_string()));
        } else if outcome.is_already_installed() {
            self.log
                .record_task(name, TaskStatus::AlreadyInstalled, version);
        } else {
            self.log.record_task(name, TaskStatus::Installed, version);
        }
    }

    /// Re-run detection for every attempted task. Findings are advisory.
    fn verify(&self, report: &mut ReportBuilder) {
        self.log.stage("Post-flight verification");
        // Attempted tasks are always a prefix of the declared order.
        let attempted = report.tasks().len();
        for task in self.tasks.iter().take(attempted) {
            let name = task.name().to_string();
            match task.detect(self.engine.executor(), self.engine.env()) {
                Ok(detection) if detection.installed => {
                    self.log.debug(&format!("{name}: verified"));
                }
                Ok(_) => {
                    let e = PostflightError::NotDetected { task: name };
                    self.log.warn(&e.to_string());
                    report.postflight(e);
                }
                Err(e) => {
                    let e = PostflightError::Detection {
                        task: name,
                        reason: e.to_string(),
                    };
                    self.log.warn(&e.to_string());
                    report.postflight(e);
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::error::{InstallError, PreflightError};
    use crate::exec::test_helpers::ScriptedExecutor;
    use crate::exec::{DRY_RUN_VERSION, DryRunExecutor, ExecResult, MockExecutor};
    use crate::install::engine::test_helpers::test_env;
    use crate::logging::Logger;
    use crate::logging::TaskEntry;

    /// One, Two, Three: each detected by `<name> --version` once its
    /// `install <name>` step has run.
    fn three_tasks() -> Vec<Task> {
        ["one", "two", "three"]
            .into_iter()
            .map(|n| {
                Task::new(n)
                    .with_probe(format!("{n} --version").as_str())
                    .with_step(format!("install {n}").as_str())
            })
            .collect()
    }

    fn executor_where_two_fails() -> ScriptedExecutor {
        ScriptedExecutor::new()
            .ok("install one", "")
            .ok_after("one --version", "install one", "1.0")
            .fail("install two")
            .ok("install three", "")
            .ok_after("three --version", "install three", "3.0")
    }

    fn orchestrator(
        tasks: Vec<Task>,
        policy: FailurePolicy,
        exec: Arc<dyn Executor>,
    ) -> (Orchestrator, Arc<Logger>) {
        let log = Arc::new(Logger::with_log_file(None));
        let o = Orchestrator::new(tasks, policy, exec, Arc::clone(&log) as _, test_env()).unwrap();
        (o, log)
    }

    fn statuses(entries: &[TaskEntry]) -> Vec<(&str, TaskStatus)> {
        entries
            .iter()
            .map(|e| (e.name.as_str(), e.status))
            .collect()
    }

    #[test]
    fn fail_fast_stops_after_first_failure() {
        let exec = Arc::new(executor_where_two_fails());
        let (mut o, log) =
            orchestrator(three_tasks(), FailurePolicy::FailFast, Arc::clone(&exec) as _);

        let report = o.run();

        assert!(!report.success());
        assert_eq!(report.tasks().len(), 2);
        assert!(report.outcome("one").unwrap().is_success());
        assert_eq!(
            report.outcome("two").unwrap().error().map(InstallError::kind),
            Some("InstallCommandError")
        );
        assert!(report.outcome("three").is_none());
        assert_eq!(report.not_attempted(), ["three".to_string()]);
        assert_eq!(exec.count("install three"), 0);
        assert_eq!(exec.count("three --version"), 0);
        assert_eq!(
            statuses(&log.task_entries()),
            vec![
                ("one", TaskStatus::Installed),
                ("two", TaskStatus::Failed),
                ("three", TaskStatus::NotAttempted)
            ]
        );
    }

    #[test]
    fn continue_on_error_attempts_every_task() {
        let exec = Arc::new(executor_where_two_fails());
        let (mut o, _log) = orchestrator(
            three_tasks(),
            FailurePolicy::ContinueOnError,
            Arc::clone(&exec) as _,
        );

        let report = o.run();

        assert!(!report.success());
        let names: Vec<&str> = report.tasks().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["one", "two", "three"]);
        assert!(report.outcome("one").unwrap().is_success());
        assert!(!report.outcome("two").unwrap().is_success());
        assert!(report.outcome("three").unwrap().is_success());
        assert!(report.not_attempted().is_empty());
        assert!(matches!(
            report.error(),
            Some(crate::error::RunError::TaskFailed { ref task, .. }) if task == "two"
        ));
    }

    #[test]
    fn second_run_is_idempotent() {
        let exec = Arc::new(
            ScriptedExecutor::new()
                .ok("install one", "")
                .ok_after("one --version", "install one", "1.0"),
        );
        let tasks = vec![three_tasks().remove(0)];
        let (mut o, _log) = orchestrator(tasks, FailurePolicy::FailFast, Arc::clone(&exec) as _);

        let first = o.run();
        let second = o.run();

        assert!(first.success() && second.success());
        assert!(!first.tasks()[0].outcome.is_already_installed());
        assert!(second.tasks()[0].outcome.is_already_installed());
        assert_eq!(exec.count("install one"), 1, "install ran once across both runs");
    }

    #[test]
    fn zero_timeout_starts_no_task() {
        let exec = Arc::new(ScriptedExecutor::new());
        let (o, _log) = orchestrator(three_tasks(), FailurePolicy::ContinueOnError, Arc::clone(&exec) as _);
        let mut o = o.with_timeout(Duration::ZERO);

        let report = o.run();

        assert!(!report.success());
        assert_eq!(report.cancelled(), Some(Cancellation::Timeout));
        assert!(report.tasks().is_empty());
        assert_eq!(report.not_attempted().len(), 3);
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn timeout_stops_at_task_boundary() {
        let exec = Arc::new(
            ScriptedExecutor::new()
                .ok("one --version", "1")
                .ok("two --version", "2")
                .ok("three --version", "3")
                .with_delay(Duration::from_millis(60)),
        );
        let (o, _log) =
            orchestrator(three_tasks(), FailurePolicy::ContinueOnError, Arc::clone(&exec) as _);
        let mut o = o.with_timeout(Duration::from_millis(30)).with_postflight(false);

        let report = o.run();

        assert_eq!(report.tasks().len(), 1, "only the task started before the deadline");
        assert_eq!(report.cancelled(), Some(Cancellation::Timeout));
        assert!(!report.success());
        assert_eq!(exec.count("two --version"), 0);
    }

    #[test]
    fn interrupt_flag_cancels_before_next_task() {
        let flag = Arc::new(AtomicBool::new(true));
        let exec = Arc::new(ScriptedExecutor::new());
        let (o, _log) = orchestrator(three_tasks(), FailurePolicy::FailFast, Arc::clone(&exec) as _);
        let mut o = o.with_interrupt(Arc::clone(&flag));

        let report = o.run();

        assert_eq!(report.cancelled(), Some(Cancellation::Interrupted));
        assert!(report.tasks().is_empty());
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn preflight_failure_aborts_before_any_task() {
        let mut mock = MockExecutor::new();
        mock.expect_which().returning(|_| false);
        mock.expect_run().never();
        mock.expect_run_unchecked().never();
        let (o, log) = orchestrator(three_tasks(), FailurePolicy::ContinueOnError, Arc::new(mock));
        let mut o = o.with_preflight(vec![PreflightCheck::Program {
            name: "curl".to_string(),
        }]);

        let report = o.run();

        assert!(!report.success());
        assert_eq!(
            report.preflight_error(),
            Some(&PreflightError::MissingProgram {
                program: "curl".to_string()
            })
        );
        assert!(report.tasks().is_empty());
        assert_eq!(report.not_attempted().len(), 3);
        assert!(
            log.task_entries()
                .iter()
                .all(|e| e.status == TaskStatus::NotAttempted)
        );
    }

    #[test]
    fn passing_preflight_lets_tasks_run() {
        let exec = Arc::new(
            ScriptedExecutor::new()
                .with_program("curl")
                .ok("one --version", "1.0"),
        );
        let tasks = vec![three_tasks().remove(0)];
        let (o, _log) = orchestrator(tasks, FailurePolicy::FailFast, Arc::clone(&exec) as _);
        let mut o = o.with_preflight(vec![PreflightCheck::Program {
            name: "curl".to_string(),
        }]);

        let report = o.run();

        assert!(report.success());
        assert!(report.preflight_error().is_none());
    }

    #[test]
    fn postflight_records_undetected_task_without_flipping_outcome() {
        // Detected on the first check, gone by verification time.
        let mut mock = MockExecutor::new();
        mock.expect_begin_task().times(1).return_const(());
        let mut calls = 0;
        mock.expect_run_unchecked().returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Ok(ExecResult::ok("1.0"))
            } else {
                Ok(ExecResult::not_started("vanished"))
            }
        });
        let tasks = vec![Task::new("Flaky").with_probe("flaky --version")];
        let (mut o, _log) = orchestrator(tasks, FailurePolicy::FailFast, Arc::new(mock));

        let report = o.run();

        assert!(report.success(), "post-flight is advisory");
        assert!(report.outcome("Flaky").unwrap().is_already_installed());
        assert_eq!(
            report.postflight_errors(),
            [PostflightError::NotDetected {
                task: "Flaky".to_string()
            }]
        );
    }

    #[test]
    fn dry_run_reports_simulated_installs_without_side_effects() {
        let inner = Arc::new(ScriptedExecutor::new());
        let dry = Arc::new(DryRunExecutor::new(Arc::clone(&inner) as _));
        let (o, _log) = orchestrator(three_tasks(), FailurePolicy::FailFast, Arc::clone(&dry) as _);
        let mut o = o.with_postflight(false);

        let report = o.run();

        assert!(report.success(), "{report:?}");
        assert_eq!(report.tasks().len(), 3);
        assert_eq!(
            dry.suppressed(),
            vec!["install one", "install two", "install three"]
        );
        assert!(
            inner.calls().iter().all(|c| c.ends_with("--version")),
            "only probes reach the real executor: {:?}",
            inner.calls()
        );
    }

    #[test]
    fn dry_run_simulation_does_not_leak_into_next_task() {
        let inner = Arc::new(ScriptedExecutor::new());
        let dry = Arc::new(DryRunExecutor::new(Arc::clone(&inner) as _));
        let tasks = vec![
            Task::new("Stepless").with_step("install stepless"),
            Task::new("Absent").with_probe("absent --version"),
        ];
        let (o, _log) = orchestrator(tasks, FailurePolicy::ContinueOnError, Arc::clone(&dry) as _);
        let mut o = o.with_postflight(false);

        let report = o.run();

        let absent = report.outcome("Absent").unwrap();
        assert!(!absent.is_already_installed());
        assert!(!absent.is_success());
        assert_ne!(absent.version(), DRY_RUN_VERSION);
        assert_eq!(dry.suppressed(), vec!["install stepless"]);
    }

    #[test]
    fn deadline_passed_during_last_task_fails_the_run() {
        let exec = Arc::new(
            ScriptedExecutor::new()
                .ok("slow --version", "1.0")
                .with_delay(Duration::from_millis(80)),
        );
        let tasks = vec![Task::new("Slow").with_probe("slow --version")];
        let (o, _log) = orchestrator(tasks, FailurePolicy::FailFast, Arc::clone(&exec) as _);
        let mut o = o.with_timeout(Duration::from_millis(20)).with_postflight(false);

        let report = o.run();

        assert!(!report.success());
        assert_eq!(report.cancelled(), Some(Cancellation::Timeout));
        assert!(
            report.outcome("Slow").unwrap().is_already_installed(),
            "the task itself is not interrupted or flipped"
        );
        assert!(report.not_attempted().is_empty());
        assert!(matches!(
            report.error(),
            Some(crate::error::RunError::Cancelled(_))
        ));
    }

    #[test]
    fn duplicate_task_names_are_rejected() {
        let log: Arc<dyn Log> = Arc::new(Logger::with_log_file(None));
        let tasks = vec![
            Task::new("Fish").with_probe("fish --version"),
            Task::new("fish").with_probe("fish -v"),
        ];

        let err = Orchestrator::new(
            tasks,
            FailurePolicy::ContinueOnError,
            Arc::new(ScriptedExecutor::new()),
            log,
            test_env(),
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::DuplicateTask(ref name) if name == "fish"));
    }

    #[test]
    fn postflight_checks_each_attempted_task_once() {
        let exec = Arc::new(
            ScriptedExecutor::new()
                .ok("a --version", "1")
                .ok("b --version", "2"),
        );
        let tasks = vec![
            Task::new("A").with_probe("a --version"),
            Task::new("B").with_probe("b --version"),
        ];
        let (mut o, _log) = orchestrator(tasks, FailurePolicy::FailFast, Arc::clone(&exec) as _);

        let report = o.run();

        assert!(report.postflight_errors().is_empty());
        assert_eq!(exec.count("a --version"), 2, "detection plus verification");
        assert_eq!(exec.count("b --version"), 2, "detection plus verification");
    }
}
