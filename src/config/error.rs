//! Errors raised while loading, validating or saving `ttylink.toml`.

use std::path::PathBuf;
use thiserror::Error;

/// Ways a ttylink configuration can fail to load or persist.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists in the search path but could not be read.
    #[error("Cannot read ttylink config '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed ttylink config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Cannot encode ttylink config as TOML: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// The file or its parent directory could not be written.
    #[error("Cannot write ttylink config '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value parsed but the port cannot run with it, e.g. an unsupported
    /// baud rate or a zero poll interval. `key` is the dotted TOML path.
    #[error("Bad value for '{key}': {message}")]
    ValidationError { key: String, message: String },

    /// A `TTYLINK_*` override did not parse.
    #[error("Bad override in '{var}': {message}")]
    EnvParseError { var: String, message: String },

    /// `save()` was called on a loader that has no file to write back to.
    #[error("No config file to use: {0}")]
    MissingRequired(String),
}

impl ConfigError {
    pub fn validation<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        Self::ValidationError {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn env_parse<V: Into<String>, M: Into<String>>(var: V, message: M) -> Self {
        Self::EnvParseError {
            var: var.into(),
            message: message.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
