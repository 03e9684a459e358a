// Configuration Loader
// Reads deployment descriptions from JSON or YAML

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::models::DeploymentSet;

use std::fs;
use std::path::Path;

/// Loader for serialized deployment descriptions
pub struct ConfigLoader;

impl ConfigLoader {
    /// Parse a JSON description
    pub fn parse_json(content: &str) -> ConfigResult<DeploymentSet> {
        serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Parse a YAML description
    pub fn parse_yaml(content: &str) -> ConfigResult<DeploymentSet> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Parse a description from file
    ///
    /// `.yaml` and `.yml` files are read as YAML, anything else as JSON.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> ConfigResult<DeploymentSet> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::parse_yaml(&content),
            _ => Self::parse_json(&content),
        }
    }

    /// Serialize a description as pretty-printed JSON
    pub fn to_json(set: &DeploymentSet) -> ConfigResult<String> {
        serde_json::to_string_pretty(set).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}
