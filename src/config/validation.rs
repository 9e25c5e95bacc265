//! Manifest checks: hard errors for task names, warnings for everything else.
use std::collections::HashSet;

use crate::error::ConfigError;
use crate::install::{CustomAction, Task};
use crate::orchestrator::PreflightCheck;

/// A validation warning detected during manifest loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// Manifest section (e.g. "tasks", "preflight").
    pub source: String,
    /// The specific item that triggered the warning.
    pub item: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    /// Warning about `item` in manifest section `source`.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            item: item.into(),
            message: message.into(),
        }
    }
}

/// Trait for manifest validators.
///
/// Validators report suspicious but loadable entries; hard errors are
/// raised by [`check_task_names`] instead.
pub trait ManifestValidator {
    /// Validate and return any warnings found.
    fn validate(&self) -> Vec<ValidationWarning>;

    /// Manifest section this validator covers.
    fn name(&self) -> &'static str;
}

/// Reject empty and duplicate task names.
///
/// Names are compared case-insensitively since `--only` and `--skip`
/// match that way.
///
/// # Errors
///
/// Returns [`ConfigError::EmptyTaskName`] (1-based position) or
/// [`ConfigError::DuplicateTask`].
pub fn check_task_names(tasks: &[Task]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for (index, task) in tasks.iter().enumerate() {
        let name = task.name().trim();
        if name.is_empty() {
            return Err(ConfigError::EmptyTaskName(index + 1));
        }
        if !seen.insert(name.to_lowercase()) {
            return Err(ConfigError::DuplicateTask(name.to_string()));
        }
    }
    Ok(())
}

/// Validator for task definitions.
#[derive(Debug)]
pub struct TaskValidator<'a> {
    tasks: &'a [Task],
}

impl<'a> TaskValidator<'a> {
    /// Validator over `tasks`.
    #[must_use]
    pub const fn new(tasks: &'a [Task]) -> Self {
        Self { tasks }
    }
}

impl ManifestValidator for TaskValidator<'_> {
    fn validate(&self) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        for task in self.tasks {
            if task.detection_probes().iter().all(|p| p.is_empty()) {
                warnings.push(ValidationWarning::new(
                    self.name(),
                    task.name(),
                    "no detection probe: the task installs on every run and its version cannot be confirmed",
                ));
            }
            if task.install_steps().iter().all(|s| s.is_empty())
                && *task.custom_action() == CustomAction::None
            {
                warnings.push(ValidationWarning::new(
                    self.name(),
                    task.name(),
                    "no install steps and no action",
                ));
            }
            if let CustomAction::CloneRepository { url, .. } = task.custom_action()
                && url.trim().is_empty()
            {
                warnings.push(ValidationWarning::new(
                    self.name(),
                    task.name(),
                    "clone_repository action has an empty url",
                ));
            }
        }
        warnings
    }

    fn name(&self) -> &'static str {
        "tasks"
    }
}

/// Validator for pre-flight checks.
#[derive(Debug)]
pub struct PreflightValidator<'a> {
    checks: &'a [PreflightCheck],
}

impl<'a> PreflightValidator<'a> {
    /// Validator over `checks`.
    #[must_use]
    pub const fn new(checks: &'a [PreflightCheck]) -> Self {
        Self { checks }
    }
}

impl ManifestValidator for PreflightValidator<'_> {
    fn validate(&self) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        for check in self.checks {
            match check {
                PreflightCheck::Network { url }
                    if !(url.starts_with("http://") || url.starts_with("https://")) =>
                {
                    warnings.push(ValidationWarning::new(
                        self.name(),
                        url,
                        "network check url should start with http:// or https://",
                    ));
                }
                PreflightCheck::Program { name } if name.trim().is_empty() => {
                    warnings.push(ValidationWarning::new(
                        self.name(),
                        check.to_string(),
                        "program check has an empty name",
                    ));
                }
                _ => {}
            }
        }
        warnings
    }

    fn name(&self) -> &'static str {
        "preflight"
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_rejected_case_insensitively() {
        let tasks = vec![
            Task::new("Fish").with_probe("fish --version"),
            Task::new("fish").with_probe("fish --version"),
        ];
        assert!(matches!(
            check_task_names(&tasks),
            Err(ConfigError::DuplicateTask(name)) if name == "fish"
        ));
    }

    #[test]
    fn empty_name_rejected_with_position() {
        let tasks = vec![Task::new("ok"), Task::new("  ")];
        assert!(matches!(
            check_task_names(&tasks),
            Err(ConfigError::EmptyTaskName(2))
        ));
    }

    #[test]
    fn unique_names_accepted() {
        let tasks = vec![Task::new("Node.js"), Task::new("Neovim")];
        assert!(check_task_names(&tasks).is_ok());
    }

    #[test]
    fn task_without_probe_warns() {
        let tasks = vec![Task::new("blind").with_step("echo hi")];
        let warnings = TaskValidator::new(&tasks).validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].item, "blind");
        assert!(warnings[0].message.contains("no detection probe"));
    }

    #[test]
    fn task_without_work_warns() {
        let tasks = vec![Task::new("idle").with_probe("true")];
        let warnings = TaskValidator::new(&tasks).validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message, "no install steps and no action");
    }

    #[test]
    fn well_formed_task_has_no_warnings() {
        let tasks = vec![
            Task::new("Fish")
                .with_probe("fish --version")
                .with_step("sudo apt-get install -y fish"),
        ];
        assert!(TaskValidator::new(&tasks).validate().is_empty());
    }

    #[test]
    fn network_check_without_scheme_warns() {
        let checks = vec![
            PreflightCheck::Network {
                url: "github.com".to_string(),
            },
            PreflightCheck::Network {
                url: "https://github.com".to_string(),
            },
        ];
        let warnings = PreflightValidator::new(&checks).validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].item, "github.com");
    }
}
