// Unit Descriptors
// Nodes of the configuration tree and their construction from serialized form

use crate::config::{
    ConfigError, ConfigLoader, ConfigResult, DeploymentConfiguration, DeploymentOptions,
    DeploymentSet,
};
use crate::error::{ServiceError, StartFailure};
use crate::execution::completion::{CompletionHandle, CompletionState};
use crate::hosts::InstanceId;
use crate::tree::summary::{RunSummary, UnitReport};

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One unit to start, together with the units gated on it
#[derive(Debug)]
pub struct UnitDescriptor {
    identifier: String,
    options: Option<DeploymentOptions>,
    dependent_groups: Vec<DependentGroup>,
    // `dependents` was present in the description, even if empty
    dependents_declared: bool,
    completion: CompletionHandle,
}

/// Siblings started concurrently once their parent has started
#[derive(Debug, Default)]
pub struct DependentGroup {
    units: Vec<Arc<UnitDescriptor>>,
}

/// Top-level group of a deployment, the root of traversal
///
/// A tree records its outcome in the descriptors' completion handles and can
/// therefore be run only once.
#[derive(Debug, Default)]
pub struct ConfigurationTree {
    root: DependentGroup,
    started: AtomicBool,
}

impl UnitDescriptor {
    /// Create a descriptor, rejecting a blank identifier
    pub fn new(identifier: impl Into<String>) -> ConfigResult<Self> {
        let identifier = identifier.into();
        if identifier.trim().is_empty() {
            return Err(ConfigError::invalid("unit", "identifier must not be blank"));
        }
        Ok(Self {
            identifier,
            options: None,
            dependent_groups: Vec::new(),
            dependents_declared: false,
            completion: CompletionHandle::new(),
        })
    }

    pub fn with_options(mut self, options: DeploymentOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Append a dependent group
    pub fn with_dependents(mut self, group: DependentGroup) -> Self {
        self.dependent_groups.push(group);
        self.dependents_declared = true;
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn options(&self) -> Option<&DeploymentOptions> {
        self.options.as_ref()
    }

    pub fn dependent_groups(&self) -> &[DependentGroup] {
        &self.dependent_groups
    }

    pub fn completion(&self) -> &CompletionHandle {
        &self.completion
    }

    pub fn state(&self) -> CompletionState {
        self.completion.state()
    }

    pub fn is_settled(&self) -> bool {
        self.completion.is_settled()
    }

    pub fn succeeded(&self) -> bool {
        self.completion.succeeded()
    }

    pub fn failed(&self) -> bool {
        self.completion.failed()
    }

    pub fn instance_id(&self) -> Option<InstanceId> {
        self.completion.instance_id()
    }

    pub fn failure_cause(&self) -> Option<StartFailure> {
        self.completion.failure_cause()
    }

    fn from_config(config: &DeploymentConfiguration, path: &str) -> ConfigResult<Self> {
        let identifier = match config.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            Some(_) => return Err(ConfigError::invalid(path, "name must not be blank")),
            None => return Err(ConfigError::invalid(path, "missing required field 'name'")),
        };

        let mut dependent_groups = Vec::new();
        for (i, set) in config.dependents.iter().flatten().enumerate() {
            let group_path = format!("{}.dependents[{}]", path, i);
            dependent_groups.push(DependentGroup::from_config(set, &group_path)?);
        }

        Ok(Self {
            identifier,
            options: config.deployment_options.clone(),
            dependent_groups,
            dependents_declared: config.dependents.is_some(),
            completion: CompletionHandle::new(),
        })
    }

    fn to_config(&self) -> DeploymentConfiguration {
        DeploymentConfiguration {
            name: Some(self.identifier.clone()),
            deployment_options: self.options.clone(),
            dependents: self.dependents_declared.then(|| {
                self.dependent_groups
                    .iter()
                    .map(DependentGroup::to_config)
                    .collect()
            }),
        }
    }
}

impl DependentGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sibling
    pub fn with_unit(mut self, unit: UnitDescriptor) -> Self {
        self.units.push(Arc::new(unit));
        self
    }

    pub fn units(&self) -> &[Arc<UnitDescriptor>] {
        &self.units
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    fn from_config(set: &DeploymentSet, path: &str) -> ConfigResult<Self> {
        let units = set
            .configurations
            .iter()
            .enumerate()
            .map(|(i, config)| {
                let unit_path = if path.is_empty() {
                    format!("configurations[{}]", i)
                } else {
                    format!("{}.configurations[{}]", path, i)
                };
                UnitDescriptor::from_config(config, &unit_path).map(Arc::new)
            })
            .collect::<ConfigResult<Vec<_>>>()?;

        Ok(Self { units })
    }

    fn to_config(&self) -> DeploymentSet {
        DeploymentSet::new(self.units.iter().map(|u| u.to_config()).collect())
    }
}

impl From<Vec<UnitDescriptor>> for DependentGroup {
    fn from(units: Vec<UnitDescriptor>) -> Self {
        Self {
            units: units.into_iter().map(Arc::new).collect(),
        }
    }
}

impl ConfigurationTree {
    pub fn new(root: DependentGroup) -> Self {
        Self {
            root,
            started: AtomicBool::new(false),
        }
    }

    /// Build a tree from its serialized description
    pub fn from_config(set: &DeploymentSet) -> ConfigResult<Self> {
        Ok(Self::new(DependentGroup::from_config(set, "")?))
    }

    /// Build a tree from a JSON description
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        Self::from_config(&ConfigLoader::parse_json(content)?)
    }

    /// Build a tree from a JSON or YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        Self::from_config(&ConfigLoader::parse_file(path)?)
    }

    /// Serialized description of this tree
    pub fn to_config(&self) -> DeploymentSet {
        self.root.to_config()
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        ConfigLoader::to_json(&self.to_config())
    }

    /// Top-level units
    pub fn units(&self) -> &[Arc<UnitDescriptor>] {
        self.root.units()
    }

    /// True when there are no top-level units
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Number of descriptors anywhere in the tree
    pub fn len(&self) -> usize {
        self.descriptors().count()
    }

    /// Depth of the deepest descriptor, top level being 0
    pub fn max_depth(&self) -> Option<usize> {
        self.descriptors().map(|(_, depth)| depth).max()
    }

    /// Pre-order walk over every descriptor with its depth
    pub fn descriptors(&self) -> Descriptors<'_> {
        Descriptors {
            stack: self.root.units.iter().rev().map(|u| (u, 0)).collect(),
        }
    }

    /// First descriptor with the given identifier, in pre-order
    pub fn find(&self, identifier: &str) -> Option<&Arc<UnitDescriptor>> {
        self.descriptors()
            .map(|(unit, _)| unit)
            .find(|unit| unit.identifier() == identifier)
    }

    /// Snapshot of every descriptor's state
    pub fn summary(&self) -> RunSummary {
        RunSummary::new(
            self.descriptors()
                .map(|(unit, depth)| UnitReport {
                    identifier: unit.identifier().to_string(),
                    depth,
                    state: unit.state(),
                })
                .collect(),
        )
    }

    /// Claim this tree for a run
    pub(crate) fn begin_run(&self) -> Result<(), ServiceError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ServiceError::AlreadyRun);
        }
        Ok(())
    }
}

impl From<DependentGroup> for ConfigurationTree {
    fn from(root: DependentGroup) -> Self {
        Self::new(root)
    }
}

/// Pre-order iterator over a tree's descriptors
pub struct Descriptors<'a> {
    stack: Vec<(&'a Arc<UnitDescriptor>, usize)>,
}

impl<'a> Iterator for Descriptors<'a> {
    type Item = (&'a Arc<UnitDescriptor>, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let (unit, depth) = self.stack.pop()?;
        for group in unit.dependent_groups.iter().rev() {
            for child in group.units.iter().rev() {
                self.stack.push((child, depth + 1));
            }
        }
        Some((unit, depth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn unit(name: &str) -> UnitDescriptor {
        UnitDescriptor::new(name).unwrap()
    }

    #[test]
    fn test_blank_identifier_rejected() {
        assert!(matches!(
            UnitDescriptor::new("   "),
            Err(ConfigError::InvalidConfiguration { .. })
        ));
        assert!(UnitDescriptor::new("").is_err());
    }

    #[test]
    fn test_missing_name_reports_path() {
        let err = ConfigurationTree::from_json(
            r#"{ "configurations": [
                { "name": "db", "dependents": [
                    { "configurations": [ { "name": "api" } ] },
                    { "configurations": [ { "name": "cache" }, { "deploymentOptions": {} } ] }
                ] }
            ] }"#,
        )
        .unwrap_err();

        match err {
            ConfigError::InvalidConfiguration { path, reason } => {
                assert_eq!(path, "configurations[0].dependents[1].configurations[1]");
                assert!(reason.contains("name"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_blank_name_rejected_from_config() {
        let err = ConfigurationTree::from_json(r#"{ "configurations": [ { "name": " " } ] }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_round_trip_preserves_shape() {
        let input = json!({
            "configurations": [
                {
                    "name": "db",
                    "deploymentOptions": { "instances": 2, "config": { "port": 5432 } },
                    "dependents": [
                        { "configurations": [ { "name": "api" }, { "name": "worker" } ] },
                        { "configurations": [] }
                    ]
                },
                { "name": "metrics" }
            ]
        });

        let set: DeploymentSet = serde_json::from_value(input.clone()).unwrap();
        let tree = ConfigurationTree::from_config(&set).unwrap();
        let output = serde_json::to_value(tree.to_config()).unwrap();

        assert_eq!(output, input);
    }

    #[test]
    fn test_round_trip_keeps_empty_dependents() {
        let input = json!({
            "configurations": [
                { "name": "db", "dependents": [] },
                { "name": "api" }
            ]
        });

        let set: DeploymentSet = serde_json::from_value(input.clone()).unwrap();
        let tree = ConfigurationTree::from_config(&set).unwrap();

        assert!(tree.find("db").unwrap().dependent_groups().is_empty());
        assert_eq!(serde_json::to_value(tree.to_config()).unwrap(), input);
    }

    #[test]
    fn test_builders_and_walk_order() {
        let tree = ConfigurationTree::new(
            DependentGroup::new()
                .with_unit(
                    unit("a")
                        .with_dependents(DependentGroup::from(vec![unit("b"), unit("c")]))
                        .with_dependents(DependentGroup::new().with_unit(unit("d"))),
                )
                .with_unit(unit("e")),
        );

        let walked: Vec<(String, usize)> = tree
            .descriptors()
            .map(|(u, depth)| (u.identifier().to_string(), depth))
            .collect();

        assert_eq!(
            walked,
            vec![
                ("a".to_string(), 0),
                ("b".to_string(), 1),
                ("c".to_string(), 1),
                ("d".to_string(), 1),
                ("e".to_string(), 0),
            ]
        );
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.max_depth(), Some(1));
        assert_eq!(tree.find("d").map(|u| u.identifier()), Some("d"));
        assert!(tree.find("z").is_none());
    }

    #[test]
    fn test_empty_tree() {
        let tree = ConfigurationTree::from_json(r#"{}"#).unwrap();

        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.max_depth(), None);
    }

    #[test]
    fn test_begin_run_only_once() {
        let tree = ConfigurationTree::default();
        assert!(tree.begin_run().is_ok());
        assert!(matches!(tree.begin_run(), Err(ServiceError::AlreadyRun)));
    }

    #[test]
    fn test_fresh_descriptor_is_unsettled() {
        let descriptor = unit("svc");

        assert!(!descriptor.is_settled());
        assert!(descriptor.instance_id().is_none());
        assert!(descriptor.failure_cause().is_none());
    }
}
