//! Errors raised while loading or validating configuration.

use std::path::PathBuf;
use thiserror::Error;

/// A configuration layer failed to load, or the merged result is invalid.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required config file does not exist.
    #[error("config file {} does not exist", path.display())]
    FileNotFound {
        /// The missing file.
        path: PathBuf,
    },

    /// A config file exists but could not be read.
    #[error("cannot read config file {}", path.display())]
    ReadError {
        /// The unreadable file.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Neither TOML nor JSON.
    #[error("config format {0:?} is not supported, expected toml or json")]
    UnsupportedFormat(String),

    /// The TOML layer did not deserialize.
    #[error("invalid TOML config: {0}")]
    TomlError(#[from] toml::de::Error),

    /// The JSON layer did not deserialize.
    #[error("invalid JSON config: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The `.env` layer could not be applied.
    #[error("cannot apply .env file: {0}")]
    DotenvError(#[from] dotenvy::Error),

    /// A merged value breaks a constraint, e.g. a docs endpoint without a
    /// leading slash.
    #[error("{field}: {reason}")]
    InvalidValue {
        /// Dotted path of the field, such as `docs.endpoint`.
        field: String,
        /// The broken constraint.
        reason: String,
    },

    /// An environment override could not be applied.
    #[error("environment override {var}: {reason}")]
    EnvParseError {
        /// The variable name.
        var: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub(crate) fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn env_parse_error(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            reason: reason.into(),
        }
    }
}
