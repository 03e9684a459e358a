// Hosts Module
// Services that actually start units on behalf of the orchestrator

pub mod command;
pub mod registry;

// Re-export key types
pub use command::CommandHost;
pub use registry::RegistryHost;

use crate::config::DeploymentOptions;
use crate::error::StartFailure;

/// Opaque identifier a host assigns to one started unit
pub type InstanceId = String;

/// Trait for deployment hosts
///
/// `start` locates the unit named `identifier`, starts it with `options`
/// passed through unmodified, and reports the new instance's id.
#[async_trait::async_trait]
pub trait DeploymentHost: Send + Sync {
    async fn start(
        &self,
        identifier: &str,
        options: Option<&DeploymentOptions>,
    ) -> Result<InstanceId, StartFailure>;
}
