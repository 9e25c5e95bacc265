//! Declarative install task: detection probes, install steps, custom action.
use serde::{Deserialize, Serialize};

use super::action::{CustomAction, HostEnv};
use crate::error::InstallError;
use crate::exec::Executor;

/// A command specification: a program plus its arguments.
///
/// Written either as a single string, split on whitespace, or as an explicit
/// list of tokens when an argument contains spaces.  A leading `~` in any
/// token is expanded to the home directory when the command is resolved.
///
/// # Examples
///
/// ```
/// use workstation_cli::install::CommandSpec;
///
/// let line = CommandSpec::from("node --version");
/// assert_eq!(line.tokens(), vec!["node", "--version"]);
///
/// let tokens = CommandSpec::from(vec!["bash", "-c", "echo a | cat"]);
/// assert_eq!(tokens.tokens().len(), 3);
/// assert!(CommandSpec::from("   ").is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    /// Whitespace-separated command line.
    Line(String),
    /// Pre-split tokens.
    Tokens(Vec<String>),
}

impl CommandSpec {
    /// The tokens of this command, program first.
    #[must_use]
    pub fn tokens(&self) -> Vec<&str> {
        match self {
            Self::Line(line) => line.split_whitespace().collect(),
            Self::Tokens(tokens) => tokens.iter().map(String::as_str).collect(),
        }
    }

    /// Whether this specification has no tokens (and is therefore skipped).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens().is_empty()
    }

    /// Split into program and arguments with `~` expanded against `env`.
    ///
    /// Returns `None` for an empty specification.
    #[must_use]
    pub fn resolve(&self, env: &HostEnv) -> Option<(String, Vec<String>)> {
        let mut tokens = self.tokens().into_iter().map(|t| env.expand(t));
        let program = tokens.next()?;
        Some((program, tokens.collect()))
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Line(line) => write!(f, "{}", line.trim()),
            Self::Tokens(tokens) => {
                let rendered: Vec<String> = tokens
                    .iter()
                    .map(|t| {
                        if t.contains(char::is_whitespace) {
                            format!("'{t}'")
                        } else {
                            t.clone()
                        }
                    })
                    .collect();
                write!(f, "{}", rendered.join(" "))
            }
        }
    }
}

impl From<&str> for CommandSpec {
    fn from(line: &str) -> Self {
        Self::Line(line.to_string())
    }
}

impl From<Vec<&str>> for CommandSpec {
    fn from(tokens: Vec<&str>) -> Self {
        Self::Tokens(tokens.into_iter().map(String::from).collect())
    }
}

/// Result of evaluating a task's detection probes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Detection {
    /// Whether any probe succeeded.
    pub installed: bool,
    /// Trimmed output of the first successful probe; empty when not installed.
    pub version: String,
}

/// Description of one installable unit.
///
/// Tasks are immutable once built: the builder methods consume `self`, and
/// the engine only ever borrows a task.
///
/// # Examples
///
/// ```
/// use workstation_cli::install::{CustomAction, Task};
///
/// let task = Task::new("Fish")
///     .with_probe("fish --version")
///     .with_step("sudo apt-get update")
///     .with_step("sudo apt-get install -y fish")
///     .with_action(CustomAction::SetDefaultShell { shell: "fish".into() });
///
/// assert_eq!(task.name(), "Fish");
/// assert_eq!(task.install_steps().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Task {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, rename = "detect")]
    detection_probes: Vec<CommandSpec>,
    #[serde(default, rename = "install")]
    install_steps: Vec<CommandSpec>,
    #[serde(default, rename = "action")]
    custom_action: CustomAction,
}

impl Task {
    /// Start building a task with no probes, steps, or action.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            detection_probes: Vec::new(),
            install_steps: Vec::new(),
            custom_action: CustomAction::None,
        }
    }

    /// Set the human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a detection probe.
    #[must_use]
    pub fn with_probe(mut self, probe: impl Into<CommandSpec>) -> Self {
        self.detection_probes.push(probe.into());
        self
    }

    /// Append an install step.
    #[must_use]
    pub fn with_step(mut self, step: impl Into<CommandSpec>) -> Self {
        self.install_steps.push(step.into());
        self
    }

    /// Set the custom action run after the install steps.
    #[must_use]
    pub fn with_action(mut self, action: CustomAction) -> Self {
        self.custom_action = action;
        self
    }

    /// Task name, unique within a run.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Detection probes in evaluation order.
    #[must_use]
    pub fn detection_probes(&self) -> &[CommandSpec] {
        &self.detection_probes
    }

    /// Install steps in execution order.
    #[must_use]
    pub fn install_steps(&self) -> &[CommandSpec] {
        &self.install_steps
    }

    /// The custom action (no-op by default).
    #[must_use]
    pub const fn custom_action(&self) -> &CustomAction {
        &self.custom_action
    }

    /// Evaluate the detection probes in order; the first success wins.
    ///
    /// A failing probe (non-zero exit, or program not found) is the expected
    /// "not installed" signal and is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::Detection`] if the executor itself fails.
    pub fn detect(&self, executor: &dyn Executor, env: &HostEnv) -> Result<Detection, InstallError> {
        for probe in &self.detection_probes {
            let Some((program, args)) = probe.resolve(env) else {
                continue;
            };
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            let result =
                executor
                    .run_unchecked(&program, &args)
                    .map_err(|e| InstallError::Detection {
                        reason: format!("{probe}: {e:#}"),
                    })?;
            if result.success {
                return Ok(Detection {
                    installed: true,
                    version: result.stdout.trim().to_string(),
                });
            }
        }
        Ok(Detection::default())
    }

    /// Run the install steps in order, then the custom action once.
    ///
    /// Stops at the first failing step; no rollback is attempted.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::InstallCommand`] for the first failing step or
    /// [`InstallError::CustomAction`] if the action fails.
    pub fn install(&self, executor: &dyn Executor, env: &HostEnv) -> Result<(), InstallError> {
        for step in &self.install_steps {
            let Some((program, args)) = step.resolve(env) else {
                continue;
            };
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            executor
                .run(&program, &args)
                .map_err(|e| InstallError::InstallCommand {
                    step: step.to_string(),
                    reason: format!("{e:#}"),
                })?;
        }

        self.custom_action
            .run(executor, env)
            .map_err(|e| InstallError::CustomAction {
                action: self.custom_action.to_string(),
                reason: format!("{e:#}"),
            })?;
        Ok(())
    }

    /// Re-run the detection probes to confirm the install and read its version.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::VersionResolution`] if no probe succeeds or the
    /// probes cannot be executed.
    pub fn resolve_version(
        &self,
        executor: &dyn Executor,
        env: &HostEnv,
    ) -> Result<String, InstallError> {
        let probes = self
            .detection_probes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        match self.detect(executor, env) {
            Ok(Detection {
                installed: true,
                version,
            }) => Ok(version),
            Ok(_) => Err(InstallError::VersionResolution {
                probes,
                reason: "no probe succeeded".to_string(),
            }),
            Err(e) => Err(InstallError::VersionResolution {
                probes,
                reason: e.to_string(),
            }),
        }
    }
}
