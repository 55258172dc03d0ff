//! Errors raised while loading or checking a [`SiftConfig`](crate::SiftConfig).

use std::path::PathBuf;
use thiserror::Error;

/// A configuration source could not be turned into a valid [`SiftConfig`](crate::SiftConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file does not exist.
    #[error("no Sift config at {path}")]
    Missing {
        /// Requested path.
        path: PathBuf,
    },

    /// The config file exists but could not be read.
    #[error("cannot read Sift config {path}")]
    Read {
        /// Requested path.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Only TOML and JSON are understood.
    #[error("unsupported config format '{0}', expected toml or json")]
    UnsupportedFormat(String),

    /// TOML syntax error or unknown key.
    #[error("malformed TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON syntax error or unknown key.
    #[error("malformed JSON config: {0}")]
    Json(#[from] serde_json::Error),

    /// A `.env` file exists but could not be parsed.
    #[error("malformed .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),

    /// A `SIFT__*` variable has a value of the wrong kind.
    #[error("{var}: {reason}")]
    Env {
        /// Variable name.
        var: String,
        /// What was expected.
        reason: String,
    },

    /// A setting parsed but is out of range.
    #[error("{field}: {reason}")]
    Invalid {
        /// Dotted setting path, e.g. `sources.GET`.
        field: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn missing(path: impl Into<PathBuf>) -> Self {
        Self::Missing { path: path.into() }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn env(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Env {
            var: var.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_setting() {
        assert_eq!(
            ConfigError::invalid("sources.FETCH", "unknown HTTP method").to_string(),
            "sources.FETCH: unknown HTTP method"
        );
        assert_eq!(
            ConfigError::env("SIFT__MAX_BODY_BYTES", "expected integer").to_string(),
            "SIFT__MAX_BODY_BYTES: expected integer"
        );
    }

    #[test]
    fn test_missing_file_message() {
        let err = ConfigError::missing("/etc/sift.toml");
        assert_eq!(err.to_string(), "no Sift config at /etc/sift.toml");
    }

    #[test]
    fn test_unsupported_format_message() {
        let err = ConfigError::UnsupportedFormat("yaml".to_string());
        assert_eq!(err.to_string(), "unsupported config format 'yaml', expected toml or json");
    }
}
