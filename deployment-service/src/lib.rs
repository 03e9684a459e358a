// Deployment Service Library
// Staged, dependency-ordered startup of a tree of deployable units

pub mod config;
pub mod error;
pub mod execution;
pub mod hosts;
pub mod tree;

// Re-export commonly used types
pub use error::{ServiceError, ServiceResult, StartFailure, StartFailureKind};

// Re-export configuration types
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, DeploymentConfiguration, DeploymentOptions,
    DeploymentSet,
};

// Re-export tree types
pub use tree::{ConfigurationTree, DependentGroup, RunSummary, UnitDescriptor, UnitReport};

// Re-export execution types
pub use execution::{
    progress_channel, AggregateTracker, CompletionHandle, CompletionState, DependentDeployer,
    DeploymentEvent, DeploymentOrchestrator, OrchestratorConfig, ProgressReceiver,
    ProgressSender,
};

// Re-export host types
pub use hosts::{CommandHost, DeploymentHost, InstanceId, RegistryHost};
