// Deployment Events
// Progress reporting for a run of the orchestrator

use crate::error::StartFailure;
use crate::hosts::InstanceId;

use std::time::Duration;
use tokio::sync::mpsc;

/// Sender for deployment progress events
pub type ProgressSender = mpsc::UnboundedSender<DeploymentEvent>;

/// Receiver for deployment progress events
pub type ProgressReceiver = mpsc::UnboundedReceiver<DeploymentEvent>;

/// Create a new progress channel
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

/// Events emitted while a tree is being started
#[derive(Debug, Clone)]
pub enum DeploymentEvent {
    /// Run started
    RunStarted { total_units: usize },

    /// Host is being asked to start a unit
    UnitStarting { identifier: String, depth: usize },

    /// Host started a unit
    UnitStarted {
        identifier: String,
        instance_id: InstanceId,
        duration: Duration,
    },

    /// Host failed to start a unit
    UnitFailed {
        identifier: String,
        cause: StartFailure,
        duration: Duration,
    },

    /// Unit will never start because an ancestor failed
    UnitSkipped { identifier: String, reason: String },

    /// Aggregate outcome is known
    ///
    /// Launches already issued may still be in flight after a failure.
    RunCompleted { success: bool, duration: Duration },
}

impl DeploymentEvent {
    pub fn run_started(total_units: usize) -> Self {
        Self::RunStarted { total_units }
    }

    pub fn unit_starting(identifier: impl Into<String>, depth: usize) -> Self {
        Self::UnitStarting {
            identifier: identifier.into(),
            depth,
        }
    }

    pub fn unit_started(
        identifier: impl Into<String>,
        instance_id: impl Into<InstanceId>,
        duration: Duration,
    ) -> Self {
        Self::UnitStarted {
            identifier: identifier.into(),
            instance_id: instance_id.into(),
            duration,
        }
    }

    pub fn unit_failed(
        identifier: impl Into<String>,
        cause: StartFailure,
        duration: Duration,
    ) -> Self {
        Self::UnitFailed {
            identifier: identifier.into(),
            cause,
            duration,
        }
    }

    pub fn unit_skipped(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnitSkipped {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }

    pub fn run_completed(success: bool, duration: Duration) -> Self {
        Self::RunCompleted { success, duration }
    }

    /// Identifier of the unit this event is about, if any
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Self::UnitStarting { identifier, .. }
            | Self::UnitStarted { identifier, .. }
            | Self::UnitFailed { identifier, .. }
            | Self::UnitSkipped { identifier, .. } => Some(identifier.as_str()),
            Self::RunStarted { .. } | Self::RunCompleted { .. } => None,
        }
    }
}

/// Helper trait for sending events, ignoring errors (fire-and-forget)
pub trait EventSender {
    fn send_event(&self, event: DeploymentEvent);
}

impl EventSender for ProgressSender {
    fn send_event(&self, event: DeploymentEvent) {
        let _ = self.send(event);
    }
}

impl EventSender for Option<ProgressSender> {
    fn send_event(&self, event: DeploymentEvent) {
        if let Some(sender) = self {
            let _ = sender.send(event);
        }
    }
}
