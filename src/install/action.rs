//! Host environment and the custom action run after a task's install steps.
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use super::task::CommandSpec;
use crate::exec::Executor;

/// Host facts a task needs to resolve paths and judge its custom action.
///
/// Captured once at startup and passed into the engine, so tests can supply
/// a fixed home directory and login shell instead of reading the process
/// environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEnv {
    /// User's home directory, used for `~` expansion.
    pub home: PathBuf,
    /// Value of `$SHELL`, if set.
    pub login_shell: Option<String>,
}

impl HostEnv {
    /// Create a host environment from explicit values.
    #[must_use]
    pub const fn new(home: PathBuf, login_shell: Option<String>) -> Self {
        Self { home, login_shell }
    }

    /// Read the host environment from `HOME` (or `USERPROFILE` on Windows) and
    /// `SHELL`.
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory variable is set.
    pub fn detect() -> Result<Self> {
        let home = if cfg!(target_os = "windows") {
            std::env::var("USERPROFILE")
                .or_else(|_| std::env::var("HOME"))
                .map_err(|_| {
                    anyhow::anyhow!("neither USERPROFILE nor HOME environment variable is set")
                })?
        } else {
            std::env::var("HOME")
                .map_err(|_| anyhow::anyhow!("HOME environment variable is not set"))?
        };
        let home = PathBuf::from(home);
        let home = dunce::canonicalize(&home).unwrap_or(home);
        let login_shell = std::env::var("SHELL").ok().filter(|s| !s.is_empty());
        Ok(Self { home, login_shell })
    }

    /// Expand a leading `~` in `token` to the home directory.
    ///
    /// Only `~` on its own and `~/...` are expanded; `~user` is left alone.
    #[must_use]
    pub fn expand(&self, token: &str) -> String {
        if token == "~" {
            return self.home.display().to_string();
        }
        token.strip_prefix("~/").map_or_else(
            || token.to_string(),
            |rest| self.home.join(rest).display().to_string(),
        )
    }
}

/// What a custom action did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionChange {
    /// The action changed the system.
    Applied,
    /// The desired state was already in place.
    AlreadyCorrect,
    /// There was nothing to do.
    NoOp,
}

/// Operation run once after a task's install steps succeed.
///
/// Selected when the task is built, and serialized in the manifest under
/// `action` with a `kind` tag:
///
/// ```toml
/// action = { kind = "set_default_shell", shell = "fish" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum CustomAction {
    /// Do nothing.
    #[default]
    None,
    /// Run one more command.
    Command {
        /// Command to run.
        command: CommandSpec,
    },
    /// `git clone` a repository unless the destination already exists.
    CloneRepository {
        /// Repository URL.
        url: String,
        /// Target directory; a leading `~` is expanded.
        destination: String,
    },
    /// Make `shell` the login shell unless `$SHELL` already names it.
    SetDefaultShell {
        /// Shell program name, e.g. `fish`.
        shell: String,
    },
}

impl fmt::Display for CustomAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Command { command } => write!(f, "run {command}"),
            Self::CloneRepository { url, destination } => {
                write!(f, "clone {url} into {destination}")
            }
            Self::SetDefaultShell { shell } => write!(f, "set default shell to {shell}"),
        }
    }
}

impl CustomAction {
    /// Run the action through `executor`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying command fails or the action is
    /// malformed (empty command, invalid shell name).
    pub fn run(&self, executor: &dyn Executor, env: &HostEnv) -> Result<ActionChange> {
        match self {
            Self::None => Ok(ActionChange::NoOp),
            Self::Command { command } => {
                let Some((program, args)) = command.resolve(env) else {
                    bail!("command is empty");
                };
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                executor.run(&program, &args)?;
                Ok(ActionChange::Applied)
            }
            Self::CloneRepository { url, destination } => {
                let destination = env.expand(destination);
                if Path::new(&destination).exists() {
                    return Ok(ActionChange::AlreadyCorrect);
                }
                executor.run("git", &["clone", url, &destination])?;
                Ok(ActionChange::Applied)
            }
            Self::SetDefaultShell { shell } => {
                if !is_valid_shell_name(shell) {
                    bail!("invalid shell name '{shell}'");
                }
                let suffix = format!("/{shell}");
                if env
                    .login_shell
                    .as_deref()
                    .is_some_and(|current| current.ends_with(&suffix))
                {
                    return Ok(ActionChange::AlreadyCorrect);
                }
                let script = format!("chsh -s \"$(command -v {shell})\"");
                executor.run("sh", &["-c", &script])?;
                Ok(ActionChange::Applied)
            }
        }
    }
}

/// Shell names are interpolated into a `sh -c` script, so only plain program
/// names are accepted.
fn is_valid_shell_name(shell: &str) -> bool {
    !shell.is_empty()
        && shell
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
