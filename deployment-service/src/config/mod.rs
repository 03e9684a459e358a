// Configuration Module
// Serialized form of a deployment tree and its loaders

pub mod error;
pub mod loader;
pub mod models;

// Re-export key types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use models::{DeploymentConfiguration, DeploymentOptions, DeploymentSet};
