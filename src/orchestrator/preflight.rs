//! Environment preconditions verified before any task runs.
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PreflightError;
use crate::exec::Executor;
use crate::install::HostEnv;

/// Upper bound for a single reachability request.
const NETWORK_TIMEOUT: Duration = Duration::from_secs(10);

/// One pre-flight check, as declared in the manifest:
///
/// ```toml
/// [[preflight]]
/// kind = "network"
/// url = "https://deb.nodesource.com"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum PreflightCheck {
    /// A program must be on `PATH`.
    Program {
        /// Program name.
        name: String,
    },
    /// The run must be root, or `sudo` must be available.
    Privilege,
    /// An HTTP(S) endpoint must answer.
    ///
    /// Any HTTP status counts as reachable; only transport failures fail.
    Network {
        /// Endpoint URL.
        url: String,
    },
    /// A directory must exist and accept new files. A leading `~` is
    /// expanded.
    WritableDir {
        /// Directory path.
        path: String,
    },
}

impl fmt::Display for PreflightCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Program { name } => write!(f, "program {name}"),
            Self::Privilege => write!(f, "elevated privileges"),
            Self::Network { url } => write!(f, "network {url}"),
            Self::WritableDir { path } => write!(f, "writable {path}"),
        }
    }
}

impl PreflightCheck {
    /// Evaluate the check with no run deadline.
    ///
    /// # Errors
    ///
    /// Returns the [`PreflightError`] describing the unmet precondition.
    pub fn run(&self, executor: &dyn Executor, env: &HostEnv) -> Result<(), PreflightError> {
        self.run_within(executor, env, None)
    }

    /// Evaluate the check, letting a network request wait no longer than
    /// `budget` (what is left of the run's deadline, if it has one).
    ///
    /// # Errors
    ///
    /// Returns the [`PreflightError`] describing the unmet precondition.
    pub fn run_within(
        &self,
        executor: &dyn Executor,
        env: &HostEnv,
        budget: Option<Duration>,
    ) -> Result<(), PreflightError> {
        match self {
            Self::Program { name } => {
                if executor.which(name) {
                    Ok(())
                } else {
                    Err(PreflightError::MissingProgram {
                        program: name.clone(),
                    })
                }
            }
            Self::Privilege => {
                if is_root(executor) || executor.which("sudo") {
                    Ok(())
                } else {
                    Err(PreflightError::NoPrivilege)
                }
            }
            Self::Network { url } => check_reachable(url, network_timeout(budget)),
            Self::WritableDir { path } => check_writable(&PathBuf::from(env.expand(path))),
        }
    }
}

/// The checks used when a manifest declares none: `sudo`-capable and a
/// writable home directory.
#[must_use]
pub fn default_checks() -> Vec<PreflightCheck> {
    vec![
        PreflightCheck::Privilege,
        PreflightCheck::WritableDir {
            path: "~".to_string(),
        },
    ]
}

fn is_root(executor: &dyn Executor) -> bool {
    executor
        .run_unchecked("id", &["-u"])
        .is_ok_and(|r| r.success && r.stdout.trim() == "0")
}

/// Request timeout: [`NETWORK_TIMEOUT`], capped by the remaining budget.
fn network_timeout(budget: Option<Duration>) -> Duration {
    budget.map_or(NETWORK_TIMEOUT, |left| left.min(NETWORK_TIMEOUT))
}

fn check_reachable(url: &str, timeout: Duration) -> Result<(), PreflightError> {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build();
    let agent = ureq::Agent::new_with_config(config);
    match agent.head(url).call() {
        Ok(_) | Err(ureq::Error::StatusCode(_)) => Ok(()),
        Err(e) => Err(PreflightError::Unreachable {
            url: url.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn check_writable(dir: &Path) -> Result<(), PreflightError> {
    let not_writable = |reason: String| PreflightError::NotWritable {
        path: dir.display().to_string(),
        reason,
    };
    if !dir.is_dir() {
        return Err(not_writable("not a directory".to_string()));
    }
    let probe = dir.join(format!(".workstation-preflight-{}", std::process::id()));
    fs::write(&probe, b"").map_err(|e| not_writable(e.to_string()))?;
    fs::remove_file(&probe).map_err(|e| not_writable(e.to_string()))?;
    Ok(())
}
