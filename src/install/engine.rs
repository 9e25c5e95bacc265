//! State machine driving one task through check, install, and verify.
use std::fmt;
use std::sync::Arc;

use super::action::HostEnv;
use super::outcome::Outcome;
use super::task::Task;
use crate::exec::Executor;
use crate::logging::Log;

/// Engine states.
///
/// ```text
/// Idle → Checking ─┬→ AlreadyInstalled
///                  ├→ DetectionFailed
///                  └→ NotInstalled → Installing ─┬→ InstallFailed
///                                                └→ Installed → VersionResolving ─┬→ Success
///                                                                                 └→ VersionUnknown
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not started.
    Idle,
    /// Evaluating detection probes.
    Checking,
    /// A probe succeeded on the first check (success, terminal).
    AlreadyInstalled,
    /// No probe succeeded.
    NotInstalled,
    /// Running install steps and the custom action.
    Installing,
    /// A step or the custom action failed (failure, terminal).
    InstallFailed,
    /// All install work succeeded.
    Installed,
    /// Re-running the probes to read the installed version.
    VersionResolving,
    /// Install confirmed (success, terminal).
    Success,
    /// Install ran but no probe succeeds afterwards (failure, terminal).
    VersionUnknown,
    /// The probes could not be executed at all (failure, terminal).
    DetectionFailed,
}

impl Phase {
    /// Whether the engine stops in this phase.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::AlreadyInstalled
                | Self::InstallFailed
                | Self::Success
                | Self::VersionUnknown
                | Self::DetectionFailed
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Checking => "checking",
            Self::AlreadyInstalled => "already installed",
            Self::NotInstalled => "not installed",
            Self::Installing => "installing",
            Self::InstallFailed => "install failed",
            Self::Installed => "installed",
            Self::VersionResolving => "resolving version",
            Self::Success => "success",
            Self::VersionUnknown => "version unknown",
            Self::DetectionFailed => "detection failed",
        };
        f.write_str(s)
    }
}

/// A non-terminal phase.  Terminal phases leave the loop as a [`Step::Done`]
/// carrying the outcome, so the engine cannot stop without one.
enum State {
    Idle,
    Checking,
    NotInstalled,
    Installing,
    Installed,
    VersionResolving,
}

impl State {
    const fn phase(&self) -> Phase {
        match self {
            Self::Idle => Phase::Idle,
            Self::Checking => Phase::Checking,
            Self::NotInstalled => Phase::NotInstalled,
            Self::Installing => Phase::Installing,
            Self::Installed => Phase::Installed,
            Self::VersionResolving => Phase::VersionResolving,
        }
    }
}

/// One transition of the state machine.
enum Step {
    Next(State),
    Done(Phase, Outcome),
}

/// Executes a single [`Task`] and produces its [`Outcome`].
///
/// Every task-level failure is captured into the outcome; nothing escapes
/// [`Engine::run`].
pub struct Engine {
    executor: Arc<dyn Executor>,
    log: Arc<dyn Log>,
    env: HostEnv,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("executor", &self.executor)
            .field("log", &"<dyn Log>")
            .field("env", &self.env)
            .finish()
    }
}

impl Engine {
    /// Create an engine over the given capabilities.
    #[must_use]
    pub fn new(executor: Arc<dyn Executor>, log: Arc<dyn Log>, env: HostEnv) -> Self {
        Self { executor, log, env }
    }

    /// The executor this engine calls through.
    #[must_use]
    pub fn executor(&self) -> &dyn Executor {
        self.executor.as_ref()
    }

    /// Host environment used for `~` expansion and custom actions.
    #[must_use]
    pub const fn env(&self) -> &HostEnv {
        &self.env
    }

    /// Run `task` to a terminal state.
    #[must_use]
    pub fn run(&self, task: &Task) -> Outcome {
        self.run_traced(task).0
    }

    /// Run `task` to a terminal state, also returning every phase visited.
    #[must_use]
    pub fn run_traced(&self, task: &Task) -> (Outcome, Vec<Phase>) {
        self.executor.begin_task();
        let mut state = State::Idle;
        let mut trace = vec![state.phase()];
        let outcome = loop {
            match self.advance(task, state) {
                Step::Next(next) => {
                    trace.push(next.phase());
                    state = next;
                }
                Step::Done(phase, outcome) => {
                    trace.push(phase);
                    break outcome;
                }
            }
        };
        self.log.debug(&format!(
            "{}: {}",
            task.name(),
            trace
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" → ")
        ));
        (outcome, trace)
    }

    fn advance(&self, task: &Task, state: State) -> Step {
        let executor = self.executor.as_ref();
        let name = task.name();
        match state {
            State::Idle => Step::Next(State::Checking),
            State::Checking => match task.detect(executor, &self.env) {
                Ok(detection) if detection.installed => {
                    self.log.success(&format!(
                        "{name} already installed{}",
                        version_suffix(&detection.version)
                    ));
                    Step::Done(
                        Phase::AlreadyInstalled,
                        Outcome::already_installed(detection.version),
                    )
                }
                Ok(_) => {
                    self.log.info(&format!("{name} not found, installing"));
                    Step::Next(State::NotInstalled)
                }
                Err(e) => {
                    self.log.error(&format!("{name}: {e}"));
                    Step::Done(Phase::DetectionFailed, Outcome::failed(e))
                }
            },
            State::NotInstalled => Step::Next(State::Installing),
            State::Installing => match task.install(executor, &self.env) {
                Ok(()) => Step::Next(State::Installed),
                Err(e) => {
                    self.log.error(&format!("{name}: {e}"));
                    Step::Done(Phase::InstallFailed, Outcome::failed(e))
                }
            },
            State::Installed => Step::Next(State::VersionResolving),
            State::VersionResolving => match task.resolve_version(executor, &self.env) {
                Ok(version) => {
                    self.log.success(&format!(
                        "{name} installed{}",
                        version_suffix(&version)
                    ));
                    Step::Done(Phase::Success, Outcome::installed(version))
                }
                Err(e) => {
                    self.log.error(&format!("{name}: {e}"));
                    Step::Done(Phase::VersionUnknown, Outcome::failed(e))
                }
            },
        }
    }
}

fn version_suffix(version: &str) -> String {
    if version.is_empty() {
        String::new()
    } else {
        format!(" ({version})")
    }
}
