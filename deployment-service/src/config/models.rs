// Configuration Models
// Serde mapping of the nested deployment description

use serde::{Deserialize, Serialize};

/// Opaque per-unit options handed to the host untouched
pub type DeploymentOptions = serde_json::Map<String, serde_json::Value>;

/// A set of sibling unit configurations
///
/// Used both for the top level of a description and for each dependent group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentSet {
    #[serde(default, alias = "units")]
    pub configurations: Vec<DeploymentConfiguration>,
}

/// Serialized form of a single unit and its dependents
///
/// Every field is optional at this level so that a missing name is reported
/// with its location when the tree is built, instead of as a parse error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfiguration {
    #[serde(default, alias = "identifier", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, alias = "options", skip_serializing_if = "Option::is_none")]
    pub deployment_options: Option<DeploymentOptions>,

    #[serde(default, alias = "dependentGroups", skip_serializing_if = "Option::is_none")]
    pub dependents: Option<Vec<DeploymentSet>>,
}

impl DeploymentSet {
    pub fn new(configurations: Vec<DeploymentConfiguration>) -> Self {
        Self { configurations }
    }
}

impl DeploymentConfiguration {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_fields_are_not_serialized() {
        let set = DeploymentSet::new(vec![DeploymentConfiguration::named("web")]);
        let value = serde_json::to_value(&set).unwrap();

        assert_eq!(value, json!({ "configurations": [ { "name": "web" } ] }));
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let set: DeploymentSet = serde_json::from_value(json!({
            "configurations": [
                { "name": "web", "deploymentID": "abc", "colour": "blue" }
            ],
            "comment": "ignored"
        }))
        .unwrap();

        assert_eq!(set.configurations.len(), 1);
        assert_eq!(set.configurations[0].name.as_deref(), Some("web"));
        assert!(set.configurations[0].deployment_options.is_none());
        assert!(set.configurations[0].dependents.is_none());
    }

    #[test]
    fn test_aliases_are_accepted() {
        let set: DeploymentSet = serde_json::from_value(json!({
            "units": [
                {
                    "identifier": "db",
                    "options": { "instances": 2 },
                    "dependentGroups": [ { "units": [ { "identifier": "api" } ] } ]
                }
            ]
        }))
        .unwrap();

        let db = &set.configurations[0];
        assert_eq!(db.name.as_deref(), Some("db"));
        assert_eq!(db.deployment_options.as_ref().unwrap()["instances"], json!(2));
        let dependents = db.dependents.as_ref().unwrap();
        assert_eq!(dependents[0].configurations[0].name.as_deref(), Some("api"));

        // Canonical names on the way out
        let value = serde_json::to_value(&set).unwrap();
        assert_eq!(value["configurations"][0]["dependents"][0]["configurations"][0]["name"], "api");
        assert_eq!(value["configurations"][0]["deploymentOptions"]["instances"], 2);
    }
}
