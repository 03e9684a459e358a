// Run Summary
// Point-in-time report of every descriptor's completion state

use crate::execution::completion::CompletionState;

/// State of one descriptor at the time the summary was taken
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    pub identifier: String,
    /// Nesting level, top-level units being 0
    pub depth: usize,
    pub state: CompletionState,
}

/// Report over a whole tree, in pre-order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub units: Vec<UnitReport>,
}

impl RunSummary {
    pub fn new(units: Vec<UnitReport>) -> Self {
        Self { units }
    }

    pub fn succeeded(&self) -> usize {
        self.count(|s| matches!(s, CompletionState::Succeeded { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, CompletionState::Failed { .. }))
    }

    pub fn pending(&self) -> usize {
        self.count(|s| matches!(s, CompletionState::Pending))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, CompletionState::Skipped { .. }))
    }

    /// True when every unit succeeded (vacuously true for an empty tree)
    pub fn is_success(&self) -> bool {
        self.succeeded() == self.units.len()
    }

    fn count(&self, predicate: impl Fn(&CompletionState) -> bool) -> usize {
        self.units.iter().filter(|u| predicate(&u.state)).count()
    }
}
