//! Plugin configuration.

use std::path::{Path, PathBuf};

use breadcrumb_core::ADVISORY_TOPIC_PREFIX;
use serde::Deserialize;
use thiserror::Error;

/// Errors loading a [`BreadcrumbConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid breadcrumb config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Plugin configuration, read from the host's configuration at install time.
///
/// Immutable once the plugin is installed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BreadcrumbConfig {
    /// Topic name prefixes treated as broker advisory traffic. Records for
    /// matching destinations are written at debug severity.
    pub advisory_prefixes: Vec<String>,
    /// Include the text body of text messages as a `body` field.
    pub log_body: bool,
}

impl Default for BreadcrumbConfig {
    fn default() -> Self {
        Self {
            advisory_prefixes: vec![ADVISORY_TOPIC_PREFIX.to_string()],
            log_body: false,
        }
    }
}

impl BreadcrumbConfig {
    /// Parses a JSON config document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON or mistyped keys.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if its contents are invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}
