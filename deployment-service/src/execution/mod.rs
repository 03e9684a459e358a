// Execution Module
// Completion tracking and dependency-ordered launching of a configuration tree

pub mod completion;
pub mod deployer;
pub mod events;
pub mod orchestrator;
pub mod tracker;

// Re-export key types
pub use completion::{CompletionHandle, CompletionState};
pub use deployer::DependentDeployer;
pub use events::{progress_channel, DeploymentEvent, EventSender, ProgressReceiver, ProgressSender};
pub use orchestrator::{DeploymentOrchestrator, OrchestratorConfig};
pub use tracker::AggregateTracker;
