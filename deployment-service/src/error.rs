// Service Errors
// Crate-level error umbrella and the per-unit start failure

use crate::config::ConfigError;

use std::fmt;
use thiserror::Error;

/// Result alias used across the service
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Top-level errors surfaced by the deployment service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Start(#[from] StartFailure),

    #[error("configuration tree has already been run")]
    AlreadyRun,
}

impl ServiceError {
    /// The start failure behind this error, if the run failed on a unit
    pub fn start_failure(&self) -> Option<&StartFailure> {
        match self {
            ServiceError::Start(cause) => Some(cause),
            _ => None,
        }
    }
}

/// Category of a failed start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartFailureKind {
    /// The host does not know how to locate the unit
    NotFound,
    /// The unit's options could not be interpreted by the host
    InvalidOptions,
    /// The host could not spawn the unit
    Spawn,
    /// The unit exited unsuccessfully while starting
    Exited,
    /// The unit was located but its own initialization failed
    Initialization,
}

impl fmt::Display for StartFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StartFailureKind::NotFound => "unit not found",
            StartFailureKind::InvalidOptions => "invalid options",
            StartFailureKind::Spawn => "spawn failed",
            StartFailureKind::Exited => "exited during startup",
            StartFailureKind::Initialization => "initialization failed",
        };
        f.write_str(label)
    }
}

/// A host could not start one unit
///
/// Recorded on the unit's completion handle and carried by the aggregate
/// result when it is the first failure observed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to start '{identifier}': {kind}: {message}")]
pub struct StartFailure {
    pub identifier: String,
    pub kind: StartFailureKind,
    pub message: String,
}

impl StartFailure {
    pub fn new(
        identifier: impl Into<String>,
        kind: StartFailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(identifier, StartFailureKind::NotFound, message)
    }

    pub fn invalid_options(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(identifier, StartFailureKind::InvalidOptions, message)
    }

    pub fn initialization(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(identifier, StartFailureKind::Initialization, message)
    }
}
