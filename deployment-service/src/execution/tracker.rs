// Aggregate Tracker
// Fail-fast fan-in over every completion handle in a tree

use crate::error::StartFailure;
use crate::execution::completion::{CompletionHandle, CompletionState};
use crate::tree::ConfigurationTree;

use tokio_stream::wrappers::WatchStream;
use tokio_stream::{StreamExt, StreamMap};

/// Combined outcome over a statically enumerated set of handles
///
/// Every descriptor in the tree is enumerated when the tracker is created,
/// including ones that will never be launched because an ancestor fails.
/// `wait` resolves `Ok` once all of them succeeded, or `Err` with the first
/// failure it observes. When several units fail concurrently, which cause is
/// reported depends on scheduling and is not defined.
pub struct AggregateTracker {
    outstanding: StreamMap<usize, WatchStream<CompletionState>>,
    // Keeps every cell alive so no stream ends before its handle settles
    _handles: Vec<CompletionHandle>,
}

impl AggregateTracker {
    /// Enumerate and subscribe to every handle in `tree`
    pub fn watch(tree: &ConfigurationTree) -> Self {
        Self::from_handles(
            tree.descriptors()
                .map(|(unit, _)| unit.completion().clone())
                .collect(),
        )
    }

    pub fn from_handles(handles: Vec<CompletionHandle>) -> Self {
        let mut outstanding = StreamMap::with_capacity(handles.len());
        for (index, handle) in handles.iter().enumerate() {
            outstanding.insert(index, WatchStream::new(handle.subscribe()));
        }
        Self {
            outstanding,
            _handles: handles,
        }
    }

    /// Number of handles not yet observed as succeeded
    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }

    /// Resolve the aggregate outcome
    ///
    /// `Skipped` handles never count as success; the failure that caused
    /// them is reported instead.
    pub async fn wait(mut self) -> Result<(), StartFailure> {
        while let Some((index, state)) = self.outstanding.next().await {
            match state {
                CompletionState::Succeeded { .. } => {
                    self.outstanding.remove(&index);
                }
                CompletionState::Failed { cause } => return Err(cause),
                CompletionState::Pending | CompletionState::Skipped { .. } => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn succeeded(id: &str) -> CompletionState {
        CompletionState::Succeeded {
            instance_id: id.to_string(),
        }
    }

    fn failed(id: &str) -> CompletionState {
        CompletionState::Failed {
            cause: StartFailure::initialization(id, "boom"),
        }
    }

    #[tokio::test]
    async fn test_no_handles_succeeds() {
        let tracker = AggregateTracker::from_handles(Vec::new());
        assert_eq!(tracker.outstanding(), 0);
        assert!(tracker.wait().await.is_ok());
    }

    #[tokio::test]
    async fn test_all_succeed() {
        let handles: Vec<_> = (0..3).map(|_| CompletionHandle::new()).collect();
        let tracker = AggregateTracker::from_handles(handles.clone());

        // One settled before waiting, the rest afterwards
        handles[0].settle(succeeded("0"));
        let writers = handles.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            writers[2].settle(succeeded("2"));
            writers[1].settle(succeeded("1"));
        });

        assert!(tracker.wait().await.is_ok());
    }

    #[tokio::test]
    async fn test_fails_fast_without_waiting_for_pending() {
        let handles: Vec<_> = (0..3).map(|_| CompletionHandle::new()).collect();
        let tracker = AggregateTracker::from_handles(handles.clone());

        handles[0].settle(succeeded("0"));
        handles[1].settle(failed("one"));
        // handles[2] stays pending forever

        let outcome = tokio::time::timeout(Duration::from_secs(1), tracker.wait())
            .await
            .expect("tracker should not wait for pending handles");
        assert_eq!(outcome.unwrap_err().identifier, "one");
    }

    #[tokio::test]
    async fn test_skipped_never_counts_as_success() {
        let handles: Vec<_> = (0..2).map(|_| CompletionHandle::new()).collect();
        let tracker = AggregateTracker::from_handles(handles.clone());

        handles[1].settle(CompletionState::Skipped {
            reason: "parent failed".to_string(),
        });
        handles[0].settle(failed("parent"));

        assert_eq!(tracker.wait().await.unwrap_err().identifier, "parent");
    }

    #[tokio::test]
    async fn test_pending_blocks_success() {
        let handles: Vec<_> = (0..2).map(|_| CompletionHandle::new()).collect();
        let tracker = AggregateTracker::from_handles(handles.clone());

        handles[0].settle(succeeded("0"));

        let outcome = tokio::time::timeout(Duration::from_millis(50), tracker.wait()).await;
        assert!(outcome.is_err(), "aggregate must not succeed while a handle is pending");
    }
}
