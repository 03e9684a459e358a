// Registry Host
// In-process host that starts units from registered factories

use crate::config::DeploymentOptions;
use crate::error::StartFailure;
use crate::hosts::{DeploymentHost, InstanceId};

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use uuid::Uuid;

type UnitFuture = Pin<Box<dyn Future<Output = Result<(), String>> + Send>>;
type UnitFactory = Arc<dyn Fn(Option<DeploymentOptions>) -> UnitFuture + Send + Sync>;

/// Host backed by named in-process factories
///
/// A factory receives the unit's options and resolves once the unit has
/// initialized, or with an error message. Unregistered identifiers fail as
/// not found. The optional `instances` option runs the factory that many
/// times under a single instance id.
#[derive(Default)]
pub struct RegistryHost {
    factories: RwLock<HashMap<String, UnitFactory>>,
    calls: Mutex<Vec<String>>,
    instances: Mutex<Vec<InstanceId>>,
}

impl RegistryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name`, replacing any previous one
    pub fn register<F, Fut>(&self, name: impl Into<String>, factory: F) -> &Self
    where
        F: Fn(Option<DeploymentOptions>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        let factory: UnitFactory =
            Arc::new(move |options: Option<DeploymentOptions>| -> UnitFuture {
                Box::pin(factory(options))
            });
        self.factories.write().insert(name.into(), factory);
        self
    }

    /// Register a unit that always starts
    pub fn register_ok(&self, name: impl Into<String>) -> &Self {
        self.register(name, |_| async { Ok(()) })
    }

    /// Register a unit whose initialization always fails with `message`
    pub fn register_failing(&self, name: impl Into<String>, message: impl Into<String>) -> &Self {
        let message = message.into();
        self.register(name, move |_| {
            let message = message.clone();
            async move { Err(message) }
        })
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.factories.read().contains_key(name)
    }

    /// Number of start requests received for `name`
    pub fn start_count(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|n| *n == name).count()
    }

    /// Number of start requests received for any unit
    pub fn total_starts(&self) -> usize {
        self.calls.lock().len()
    }

    /// Identifiers in the order their start requests arrived
    pub fn start_order(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Instance ids of successfully started units, in start order
    pub fn instances(&self) -> Vec<InstanceId> {
        self.instances.lock().clone()
    }

    fn instance_count(
        identifier: &str,
        options: Option<&DeploymentOptions>,
    ) -> Result<u64, StartFailure> {
        match options.and_then(|o| o.get("instances")) {
            None => Ok(1),
            Some(value) => value.as_u64().filter(|n| *n >= 1).ok_or_else(|| {
                StartFailure::invalid_options(
                    identifier,
                    format!("'instances' must be a positive integer, got {}", value),
                )
            }),
        }
    }
}

#[async_trait::async_trait]
impl DeploymentHost for RegistryHost {
    async fn start(
        &self,
        identifier: &str,
        options: Option<&DeploymentOptions>,
    ) -> Result<InstanceId, StartFailure> {
        self.calls.lock().push(identifier.to_string());

        let factory = self.factories.read().get(identifier).cloned();
        let factory = factory.ok_or_else(|| {
            StartFailure::not_found(
                identifier,
                format!("no unit registered under '{}'", identifier),
            )
        })?;

        for _ in 0..Self::instance_count(identifier, options)? {
            (*factory)(options.cloned())
                .await
                .map_err(|message| StartFailure::initialization(identifier, message))?;
        }

        let instance_id = Uuid::new_v4().to_string();
        self.instances.lock().push(instance_id.clone());
        Ok(instance_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StartFailureKind;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn options(value: serde_json::Value) -> DeploymentOptions {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn test_unknown_unit_not_found() {
        let host = RegistryHost::new();
        let err = host.start("ghost", None).await.unwrap_err();

        assert_eq!(err.kind, StartFailureKind::NotFound);
        assert!(err.to_string().contains("unit not found"));
        assert_eq!(host.start_count("ghost"), 1);
        assert!(host.instances().is_empty());
    }

    #[tokio::test]
    async fn test_each_start_gets_fresh_id() {
        let host = RegistryHost::new();
        host.register_ok("web");

        let first = host.start("web", None).await.unwrap();
        let second = host.start("web", None).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(host.instances(), vec![first, second]);
    }

    #[tokio::test]
    async fn test_factory_error_is_initialization_failure() {
        let host = RegistryHost::new();
        host.register_failing("db", "port already in use");

        let err = host.start("db", None).await.unwrap_err();
        assert_eq!(err.kind, StartFailureKind::Initialization);
        assert_eq!(err.message, "port already in use");
    }

    #[tokio::test]
    async fn test_instances_option() {
        let host = RegistryHost::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        host.register("worker", move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        host.start("worker", Some(&options(json!({ "instances": 3 }))))
            .await
            .unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert_eq!(host.instances().len(), 1);

        let err = host
            .start("worker", Some(&options(json!({ "instances": 0 }))))
            .await
            .unwrap_err();
        assert_eq!(err.kind, StartFailureKind::InvalidOptions);
    }

    #[test]
    fn test_registration() {
        let host = RegistryHost::new();
        host.register_ok("a").register_ok("b");

        assert!(host.is_registered("a"));
        assert!(host.is_registered("b"));
        assert!(!host.is_registered("c"));
    }
}
