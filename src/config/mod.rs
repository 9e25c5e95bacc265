//! Task manifest: which tasks to run and which pre-flight checks guard them.
//!
//! The default manifest is compiled into the binary from `conf/tasks.toml`.
//! A different file can be supplied with `--manifest` or the
//! `WORKSTATION_MANIFEST` environment variable.
pub mod toml_loader;
pub mod validation;

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::install::Task;
use crate::orchestrator::PreflightCheck;
use crate::orchestrator::preflight::default_checks;
use validation::{ManifestValidator, PreflightValidator, TaskValidator, ValidationWarning};

/// Manifest embedded at build time.
pub const BUILTIN_MANIFEST: &str = include_str!("../../conf/tasks.toml");

/// Environment variable naming a manifest file.
pub const MANIFEST_ENV: &str = "WORKSTATION_MANIFEST";

/// Where a manifest was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    /// The manifest compiled into the binary.
    Builtin,
    /// A file on disk.
    File(PathBuf),
}

impl fmt::Display for ManifestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin => write!(f, "{}", toml_loader::BUILTIN_ORIGIN),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A loaded and validated manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Lines printed after a successful install.
    #[serde(default)]
    pub hints: Vec<String>,
    /// Pre-flight checks; [`default_checks`] when absent.
    #[serde(default)]
    pub preflight: Option<Vec<PreflightCheck>>,
    /// Tasks in execution order.
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Manifest {
    /// Load the manifest at `path`, or the builtin one when `path` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not parse, or fails
    /// name validation.
    pub fn load(path: Option<&Path>) -> Result<(Self, ManifestSource), ConfigError> {
        match path {
            Some(path) => {
                let path = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
                let manifest: Self = toml_loader::load_file(&path)?;
                validation::check_task_names(&manifest.tasks)?;
                Ok((manifest, ManifestSource::File(path)))
            }
            None => Ok((Self::builtin()?, ManifestSource::Builtin)),
        }
    }

    /// Parse the manifest compiled into the binary.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded manifest is invalid.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::parse(BUILTIN_MANIFEST, toml_loader::BUILTIN_ORIGIN)
    }

    /// Parse manifest text; `origin` names the source in errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the text does not parse or fails name validation.
    pub fn parse(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let manifest: Self = toml_loader::parse_str(content, origin)?;
        validation::check_task_names(&manifest.tasks)?;
        Ok(manifest)
    }

    /// Pre-flight checks to run, falling back to the defaults.
    #[must_use]
    pub fn preflight_checks(&self) -> Vec<PreflightCheck> {
        self.preflight.clone().unwrap_or_else(default_checks)
    }

    /// Non-fatal findings about the manifest's contents.
    #[must_use]
    pub fn validate(&self) -> Vec<ValidationWarning> {
        let checks = self.preflight_checks();
        let validators: [&dyn ManifestValidator; 2] = [
            &TaskValidator::new(&self.tasks),
            &PreflightValidator::new(&checks),
        ];
        validators.iter().flat_map(|v| v.validate()).collect()
    }

    /// Tasks selected by `--only` and `--skip`, in manifest order.
    ///
    /// An empty `only` selects every task. Names match case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownTask`] if a filter names no task.
    pub fn select(&self, only: &[String], skip: &[String]) -> Result<Vec<Task>, ConfigError> {
        for name in only.iter().chain(skip) {
            if !self.tasks.iter().any(|t| t.name().eq_ignore_ascii_case(name)) {
                return Err(ConfigError::UnknownTask(name.clone()));
            }
        }
        Ok(self
            .tasks
            .iter()
            .filter(|t| only.is_empty() || only.iter().any(|n| t.name().eq_ignore_ascii_case(n)))
            .filter(|t| !skip.iter().any(|n| t.name().eq_ignore_ascii_case(n)))
            .cloned()
            .collect())
    }
}

/// Resolve the manifest path from the command line, then the environment.
#[must_use]
pub fn resolve_manifest_path(cli: Option<&Path>) -> Option<PathBuf> {
    cli.map(Path::to_path_buf).or_else(|| {
        std::env::var_os(MANIFEST_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::install::CustomAction;

    const SAMPLE: &str = r#"
        hints = ["run it"]

        [[preflight]]
        kind = "program"
        name = "echo"

        [[tasks]]
        name = "Echo"
        detect = ["echo 1.0"]

        [[tasks]]
        name = "Missing"
        detect = ["doesnotexist --version"]
        install = ["echo installed"]
        action = { kind = "command", command = ["sh", "-c", "exit 0"] }
    "#;

    #[test]
    fn builtin_manifest_parses() {
        let manifest = Manifest::builtin().unwrap();
        assert!(!manifest.tasks.is_empty());
        assert!(!manifest.hints.is_empty());
        assert!(
            manifest
                .tasks
                .iter()
                .any(|t| matches!(t.custom_action(), CustomAction::SetDefaultShell { .. }))
        );
    }

    #[test]
    fn builtin_manifest_has_no_warnings() {
        let manifest = Manifest::builtin().unwrap();
        assert_eq!(manifest.validate(), Vec::new());
    }

    #[test]
    fn parse_sample() {
        let manifest = Manifest::parse(SAMPLE, "sample").unwrap();
        assert_eq!(manifest.tasks.len(), 2);
        assert_eq!(manifest.hints, vec!["run it"]);
        assert_eq!(
            manifest.preflight_checks(),
            vec![PreflightCheck::Program {
                name: "echo".to_string()
            }]
        );
        assert_eq!(
            manifest.tasks[1].custom_action().to_string(),
            "run sh -c 'exit 0'"
        );
    }

    #[test]
    fn missing_preflight_uses_defaults() {
        let manifest = Manifest::parse("[[tasks]]\nname = \"x\"\ndetect = [\"true\"]\ninstall = [\"true\"]\n", "t").unwrap();
        assert_eq!(manifest.preflight_checks(), default_checks());
    }

    #[test]
    fn empty_preflight_list_disables_checks() {
        let manifest = Manifest::parse("preflight = []\n", "t").unwrap();
        assert!(manifest.preflight_checks().is_empty());
    }

    #[test]
    fn duplicate_names_fail_to_load() {
        let text = "[[tasks]]\nname = \"a\"\n\n[[tasks]]\nname = \"A\"\n";
        assert!(matches!(
            Manifest::parse(text, "t"),
            Err(ConfigError::DuplicateTask(_))
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            Manifest::parse("[[tasks]]\nname = \"a\"\ncheck = []\n", "t"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let (manifest, source) = Manifest::load(Some(&path)).unwrap();

        assert_eq!(manifest.tasks.len(), 2);
        assert!(matches!(source, ManifestSource::File(_)));
    }

    #[test]
    fn load_without_path_is_builtin() {
        let (_, source) = Manifest::load(None).unwrap();
        assert_eq!(source, ManifestSource::Builtin);
        assert_eq!(source.to_string(), "<builtin>");
    }

    #[test]
    fn select_only_and_skip() {
        let manifest = Manifest::parse(SAMPLE, "sample").unwrap();

        let only = manifest.select(&["echo".to_string()], &[]).unwrap();
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].name(), "Echo");

        let skipped = manifest.select(&[], &["ECHO".to_string()]).unwrap();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].name(), "Missing");

        assert_eq!(manifest.select(&[], &[]).unwrap().len(), 2);
    }

    #[test]
    fn select_unknown_name_fails() {
        let manifest = Manifest::parse(SAMPLE, "sample").unwrap();
        assert!(matches!(
            manifest.select(&["nvim".to_string()], &[]),
            Err(ConfigError::UnknownTask(name)) if name == "nvim"
        ));
    }

    #[test]
    fn cli_path_wins_over_environment() {
        let path = PathBuf::from("/tmp/custom.toml");
        assert_eq!(resolve_manifest_path(Some(&path)), Some(path));
    }
}
