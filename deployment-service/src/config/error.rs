// Configuration errors

use std::io;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while reading or building a configuration tree
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration at {path}: {reason}")]
    InvalidConfiguration { path: String, reason: String },

    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ConfigError {
    pub fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
