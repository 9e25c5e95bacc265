//! What happened to one task.
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::error::InstallError;

/// Structured result of processing one task.
///
/// Only three shapes exist, one per constructor, so an outcome can never be
/// "already installed" and failed at once, or failed without an error.
///
/// # Examples
///
/// ```
/// use workstation_cli::install::Outcome;
///
/// let present = Outcome::already_installed("v20.11.0");
/// assert!(present.is_success());
/// assert!(present.is_already_installed());
/// assert!(present.error().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    already_installed: bool,
    version: String,
    error: Option<InstallError>,
}

impl Outcome {
    /// The software was detected before any install step ran.
    #[must_use]
    pub fn already_installed(version: impl Into<String>) -> Self {
        Self {
            already_installed: true,
            version: version.into(),
            error: None,
        }
    }

    /// The software was installed and its version confirmed.
    #[must_use]
    pub fn installed(version: impl Into<String>) -> Self {
        Self {
            already_installed: false,
            version: version.into(),
            error: None,
        }
    }

    /// The task failed with `error`.
    #[must_use]
    pub const fn failed(error: InstallError) -> Self {
        Self {
            already_installed: false,
            version: String::new(),
            error: Some(error),
        }
    }

    /// Whether detection succeeded on the first check.
    #[must_use]
    pub const fn is_already_installed(&self) -> bool {
        self.already_installed
    }

    /// Whether the task succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Detected version text; empty when unknown.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The failure, present iff the task did not succeed.
    #[must_use]
    pub const fn error(&self) -> Option<&InstallError> {
        self.error.as_ref()
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Outcome", 4)?;
        s.serialize_field("already_installed", &self.already_installed)?;
        s.serialize_field("success", &self.is_success())?;
        s.serialize_field("version", &self.version)?;
        s.serialize_field(
            "error",
            &self.error.as_ref().map(|e| ErrorReport {
                kind: e.kind(),
                message: e.to_string(),
            }),
        )?;
        s.end()
    }
}

#[derive(Serialize)]
struct ErrorReport {
    kind: &'static str,
    message: String,
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn installed_outcome_is_success_not_already_installed() {
        let o = Outcome::installed("fish, version 3.7.1");
        assert!(o.is_success());
        assert!(!o.is_already_installed());
        assert_eq!(o.version(), "fish, version 3.7.1");
    }

    #[test]
    fn failed_outcome_carries_error_and_empty_version() {
        let o = Outcome::failed(InstallError::Detection {
            reason: "boom".to_string(),
        });
        assert!(!o.is_success());
        assert!(!o.is_already_installed());
        assert_eq!(o.version(), "");
        assert_eq!(o.error().map(InstallError::kind), Some("DetectionError"));
    }

    #[test]
    fn serializes_error_kind_and_message() {
        let o = Outcome::failed(InstallError::VersionResolution {
            probes: "doesnotexist --version".to_string(),
            reason: "no probe succeeded".to_string(),
        });
        let json = serde_json::to_value(&o).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["already_installed"], false);
        assert_eq!(json["error"]["kind"], "VersionResolutionError");
    }

    #[test]
    fn serializes_success_with_null_error() {
        let json = serde_json::to_value(Outcome::already_installed("1.0")).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["version"], "1.0");
        assert!(json["error"].is_null());
    }
}
