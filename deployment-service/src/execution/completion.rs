// Completion Handles
// Single-assignment result cell attached to every unit descriptor

use crate::error::StartFailure;
use crate::hosts::InstanceId;

use std::sync::Arc;
use tokio::sync::watch;

/// Outcome of one unit for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionState {
    /// Not started yet, or never started because an ancestor failed
    Pending,
    /// The host started the unit
    Succeeded { instance_id: InstanceId },
    /// The host could not start the unit
    Failed { cause: StartFailure },
    /// Explicitly marked as never started because an ancestor failed
    Skipped { reason: String },
}

impl CompletionState {
    pub fn is_settled(&self) -> bool {
        !matches!(self, CompletionState::Pending)
    }

    pub fn label(&self) -> &'static str {
        match self {
            CompletionState::Pending => "pending",
            CompletionState::Succeeded { .. } => "succeeded",
            CompletionState::Failed { .. } => "failed",
            CompletionState::Skipped { .. } => "skipped",
        }
    }
}

/// Shared handle on a unit's completion cell
///
/// Clones observe the same cell. The cell moves out of `Pending` at most once;
/// later attempts to settle it are ignored.
#[derive(Debug, Clone)]
pub struct CompletionHandle {
    cell: Arc<watch::Sender<CompletionState>>,
}

impl CompletionHandle {
    pub fn new() -> Self {
        let (cell, _) = watch::channel(CompletionState::Pending);
        Self {
            cell: Arc::new(cell),
        }
    }

    /// Snapshot of the current state
    pub fn state(&self) -> CompletionState {
        self.cell.borrow().clone()
    }

    pub fn is_settled(&self) -> bool {
        self.cell.borrow().is_settled()
    }

    pub fn succeeded(&self) -> bool {
        matches!(*self.cell.borrow(), CompletionState::Succeeded { .. })
    }

    pub fn failed(&self) -> bool {
        matches!(*self.cell.borrow(), CompletionState::Failed { .. })
    }

    pub fn skipped(&self) -> bool {
        matches!(*self.cell.borrow(), CompletionState::Skipped { .. })
    }

    /// Instance id assigned by the host, once succeeded
    pub fn instance_id(&self) -> Option<InstanceId> {
        match &*self.cell.borrow() {
            CompletionState::Succeeded { instance_id } => Some(instance_id.clone()),
            _ => None,
        }
    }

    /// Failure cause reported by the host, once failed
    pub fn failure_cause(&self) -> Option<StartFailure> {
        match &*self.cell.borrow() {
            CompletionState::Failed { cause } => Some(cause.clone()),
            _ => None,
        }
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<CompletionState> {
        self.cell.subscribe()
    }

    /// Wait until the cell leaves `Pending`
    ///
    /// Never resolves for a unit that is skipped without `Skipped` marking.
    pub async fn settled(&self) -> CompletionState {
        let mut rx = self.subscribe();
        loop {
            {
                let state = rx.borrow_and_update();
                if state.is_settled() {
                    return state.clone();
                }
            }
            if rx.changed().await.is_err() {
                return rx.borrow().clone();
            }
        }
    }

    /// Move the cell out of `Pending`
    ///
    /// Returns `false` when the cell was already settled or `state` is itself
    /// `Pending`; the stored outcome is left untouched in both cases.
    pub(crate) fn settle(&self, state: CompletionState) -> bool {
        if !state.is_settled() {
            return false;
        }
        self.cell.send_if_modified(|current| {
            if current.is_settled() {
                false
            } else {
                *current = state;
                true
            }
        })
    }
}

impl Default for CompletionHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_pending_exposes_nothing() {
        let handle = CompletionHandle::new();

        assert!(!handle.is_settled());
        assert!(!handle.succeeded());
        assert!(!handle.failed());
        assert_eq!(handle.instance_id(), None);
        assert_eq!(handle.failure_cause(), None);
        assert_eq!(handle.state(), CompletionState::Pending);
    }

    #[test]
    fn test_settles_once() {
        let handle = CompletionHandle::new();

        assert!(handle.settle(CompletionState::Succeeded {
            instance_id: "one".to_string()
        }));
        assert!(!handle.settle(CompletionState::Failed {
            cause: StartFailure::initialization("unit", "late")
        }));

        assert!(handle.succeeded());
        assert_eq!(handle.instance_id().as_deref(), Some("one"));
        assert_eq!(handle.failure_cause(), None);
    }

    #[test]
    fn test_settle_rejects_pending() {
        let handle = CompletionHandle::new();
        assert!(!handle.settle(CompletionState::Pending));
        assert!(!handle.is_settled());
    }

    #[test]
    fn test_clones_share_cell() {
        let handle = CompletionHandle::new();
        let view = handle.clone();

        handle.settle(CompletionState::Failed {
            cause: StartFailure::not_found("ghost", "no such unit"),
        });

        assert!(view.failed());
        assert_eq!(view.failure_cause().unwrap().identifier, "ghost");
        // Repeated reads are stable
        assert_eq!(view.state(), view.state());
    }

    #[tokio::test]
    async fn test_settled_waits_for_outcome() {
        let handle = CompletionHandle::new();
        let writer = handle.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            writer.settle(CompletionState::Succeeded {
                instance_id: "late".to_string(),
            });
        });

        let state = handle.settled().await;
        assert_eq!(
            state,
            CompletionState::Succeeded {
                instance_id: "late".to_string()
            }
        );
    }
}
