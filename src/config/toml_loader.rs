//! TOML manifest reading and parsing.
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::error::ConfigError;

/// Origin label used in error messages for the embedded manifest.
pub const BUILTIN_ORIGIN: &str = "<builtin>";

/// Read a manifest file and deserialize it.
///
/// Unlike optional configuration files, a manifest the user pointed at must
/// exist: a missing file is an error.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read or
/// [`ConfigError::Parse`] if it is not valid for `T`.
pub fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_str(&content, &path.display().to_string())
}

/// Deserialize manifest text; `origin` names the source in errors.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] with the parser's message.
pub fn parse_str<T: DeserializeOwned>(content: &str, origin: &str) -> Result<T, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::Parse {
        path: origin.to_string(),
        message: e.message().to_string(),
    })
}
