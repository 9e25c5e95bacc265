//! Domain-specific error types for the provisioning engine.
//!
//! Internal modules return typed errors while command handlers at the CLI
//! boundary convert them to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! RunError
//! ├── Config(ConfigError)       manifest loading and validation
//! ├── Preflight(PreflightError) environment precondition unmet
//! ├── TaskFailed(InstallError)  first task that did not succeed
//! └── Cancelled                 timeout or interrupt at a task boundary
//! ```
//!
//! [`InstallError`] is captured into each task's outcome and never
//! propagated past the engine.  [`PostflightError`] is advisory only.

use thiserror::Error;

/// Top-level error returned by a provisioning run.
#[derive(Error, Debug)]
pub enum RunError {
    /// The manifest could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A pre-flight check failed; no task was attempted.
    #[error("Pre-flight check failed: {0}")]
    Preflight(#[from] PreflightError),

    /// A task did not succeed.
    #[error("Task '{task}' failed: {source}")]
    TaskFailed {
        /// Name of the first failed task.
        task: String,
        /// The failure captured in the task's outcome.
        source: InstallError,
    },

    /// The run stopped before all tasks were attempted.
    #[error("Run cancelled: {0}")]
    Cancelled(String),
}

/// Failures captured into a single task's outcome.
///
/// Reasons are rendered to strings when captured so outcomes stay cheap to
/// clone and serialize.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstallError {
    /// The detection mechanism itself malfunctioned (not "not found").
    #[error("detection failed: {reason}")]
    Detection {
        /// Underlying execution failure.
        reason: String,
    },

    /// A declared install step failed; later steps were not attempted.
    #[error("install step `{step}` failed: {reason}")]
    InstallCommand {
        /// The failing step as written in the task.
        step: String,
        /// Underlying execution failure.
        reason: String,
    },

    /// The custom action run after the install steps failed.
    #[error("custom action `{action}` failed: {reason}")]
    CustomAction {
        /// Description of the action.
        action: String,
        /// Underlying failure.
        reason: String,
    },

    /// Installation reported success but no detection probe succeeds.
    #[error("installed, but version could not be resolved from [{probes}]: {reason}")]
    VersionResolution {
        /// The probes that were re-run, comma separated.
        probes: String,
        /// Why resolution failed.
        reason: String,
    },
}

impl InstallError {
    /// Stable name of the error kind, used in reports.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Detection { .. } => "DetectionError",
            Self::InstallCommand { .. } => "InstallCommandError",
            Self::CustomAction { .. } => "CustomActionError",
            Self::VersionResolution { .. } => "VersionResolutionError",
        }
    }
}

/// Environment preconditions checked before any task runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreflightError {
    /// A required program is not on `PATH`.
    #[error("required program '{program}' not found on PATH")]
    MissingProgram {
        /// Program name.
        program: String,
    },

    /// Neither root nor `sudo` is available.
    #[error("elevated privileges unavailable: not running as root and sudo not found")]
    NoPrivilege,

    /// An endpoint could not be reached.
    #[error("cannot reach {url}: {reason}")]
    Unreachable {
        /// Endpoint URL.
        url: String,
        /// Transport failure.
        reason: String,
    },

    /// A directory is missing or not writable.
    #[error("directory {path} is not writable: {reason}")]
    NotWritable {
        /// Directory path.
        path: String,
        /// Why the directory is unusable.
        reason: String,
    },
}

/// Advisory findings from the post-flight verification pass.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PostflightError {
    /// The task's software is not detected after the run.
    #[error("'{task}' is not detected after the run")]
    NotDetected {
        /// Task name.
        task: String,
    },

    /// Detection itself failed during verification.
    #[error("verifying '{task}' failed: {reason}")]
    Detection {
        /// Task name.
        task: String,
        /// Underlying failure.
        reason: String,
    },
}

/// Errors that arise from manifest loading and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The manifest file could not be read.
    #[error("IO error reading manifest {path}: {source}")]
    Io {
        /// Path to the manifest.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The manifest is not valid TOML or does not match the schema.
    #[error("Invalid manifest {path}: {message}")]
    Parse {
        /// Path (or `<builtin>`) of the manifest.
        path: String,
        /// Parser message.
        message: String,
    },

    /// Two tasks share a name.
    #[error("Duplicate task name '{0}'")]
    DuplicateTask(String),

    /// A task has an empty name.
    #[error("Task #{0} has an empty name")]
    EmptyTaskName(usize),

    /// A `--only` / `--skip` filter names no task.
    #[error("No task matches '{0}'")]
    UnknownTask(String),
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn install_error_kinds_are_stable() {
        let cases = [
            (
                InstallError::Detection {
                    reason: "fork failed".to_string(),
                },
                "DetectionError",
            ),
            (
                InstallError::InstallCommand {
                    step: "sudo apt-get install -y fish".to_string(),
                    reason: "exit 100".to_string(),
                },
                "InstallCommandError",
            ),
            (
                InstallError::CustomAction {
                    action: "set default shell to fish".to_string(),
                    reason: "chsh failed".to_string(),
                },
                "CustomActionError",
            ),
            (
                InstallError::VersionResolution {
                    probes: "nvim --version".to_string(),
                    reason: "no probe succeeded".to_string(),
                },
                "VersionResolutionError",
            ),
        ];
        for (err, kind) in cases {
            assert_eq!(err.kind(), kind);
        }
    }

    #[test]
    fn install_command_display_names_step() {
        let e = InstallError::InstallCommand {
            step: "npm install -g @anthropic-ai/claude-code".to_string(),
            reason: "exit 1".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "install step `npm install -g @anthropic-ai/claude-code` failed: exit 1"
        );
    }

    #[test]
    fn preflight_missing_program_display() {
        let e = PreflightError::MissingProgram {
            program: "curl".to_string(),
        };
        assert_eq!(e.to_string(), "required program 'curl' not found on PATH");
    }

    #[test]
    fn run_error_from_preflight() {
        let e: RunError = PreflightError::NoPrivilege.into();
        assert!(e.to_string().starts_with("Pre-flight check failed"));
    }

    #[test]
    fn run_error_task_failed_has_source() {
        use std::error::Error as StdError;
        let e = RunError::TaskFailed {
            task: "Fish".to_string(),
            source: InstallError::Detection {
                reason: "boom".to_string(),
            },
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("Fish"));
    }

    #[test]
    fn config_error_io_display() {
        let e = ConfigError::Io {
            path: "/etc/workstation/tasks.toml".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert!(e.to_string().contains("/etc/workstation/tasks.toml"));
    }

    #[test]
    fn postflight_not_detected_display() {
        let e = PostflightError::NotDetected {
            task: "Neovim".to_string(),
        };
        assert_eq!(e.to_string(), "'Neovim' is not detected after the run");
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn all_error_types_are_send_sync() {
        assert_send_sync::<RunError>();
        assert_send_sync::<InstallError>();
        assert_send_sync::<PreflightError>();
        assert_send_sync::<PostflightError>();
        assert_send_sync::<ConfigError>();
    }

    #[test]
    fn errors_convert_to_anyhow() {
        let _anyhow_err: anyhow::Error = ConfigError::DuplicateTask("x".to_string()).into();
        let _anyhow_err: anyhow::Error = RunError::Cancelled("timeout".to_string()).into();
    }
}
