// Dependent Deployer
// Start-and-reply entry point for applications embedding the orchestrator

use crate::error::ServiceResult;
use crate::execution::orchestrator::DeploymentOrchestrator;
use crate::tree::ConfigurationTree;

use std::sync::Arc;
use tokio::sync::oneshot;

/// Owns a configuration tree and starts it on request
///
/// `start` returns immediately; the outcome is delivered through the reply
/// channel once the aggregate settles. Descriptors stay inspectable through
/// `tree` afterwards.
pub struct DependentDeployer {
    orchestrator: Arc<DeploymentOrchestrator>,
    tree: Option<Arc<ConfigurationTree>>,
}

impl DependentDeployer {
    pub fn new(orchestrator: DeploymentOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            tree: None,
        }
    }

    pub fn with_tree(mut self, tree: ConfigurationTree) -> Self {
        self.tree = Some(Arc::new(tree));
        self
    }

    pub fn set_tree(&mut self, tree: ConfigurationTree) {
        self.tree = Some(Arc::new(tree));
    }

    pub fn tree(&self) -> Option<&Arc<ConfigurationTree>> {
        self.tree.as_ref()
    }

    /// Start the tree and complete `reply` with the aggregate outcome
    ///
    /// Without a tree, or with an empty one, `reply` succeeds immediately.
    /// Must be called from within a tokio runtime.
    pub fn start(&self, reply: oneshot::Sender<ServiceResult<()>>) {
        let tree = match &self.tree {
            Some(tree) if !tree.is_empty() => Arc::clone(tree),
            _ => {
                let _ = reply.send(Ok(()));
                return;
            }
        };

        let orchestrator = Arc::clone(&self.orchestrator);
        tokio::spawn(async move {
            let outcome = orchestrator.run(&tree).await;
            let _ = reply.send(outcome);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hosts::RegistryHost;

    fn deployer(host: RegistryHost) -> DependentDeployer {
        DependentDeployer::new(DeploymentOrchestrator::new(Arc::new(host)))
    }

    #[tokio::test]
    async fn test_nothing_to_deploy() {
        let deployer = deployer(RegistryHost::new());
        assert!(deployer.tree().is_none());

        let (tx, rx) = oneshot::channel();
        deployer.start(tx);

        assert!(rx.await.unwrap().is_ok());
        assert!(deployer.tree().is_none());
    }

    #[tokio::test]
    async fn test_reply_carries_outcome() {
        let host = RegistryHost::new();
        host.register_ok("web");
        let tree = ConfigurationTree::from_json(
            r#"{ "configurations": [ { "name": "web", "dependents": [ { "configurations": [ { "name": "missing" } ] } ] } ] }"#,
        )
        .unwrap();
        let deployer = deployer(host).with_tree(tree);

        let (tx, rx) = oneshot::channel();
        deployer.start(tx);
        let err = rx.await.unwrap().unwrap_err();

        assert_eq!(err.start_failure().unwrap().identifier, "missing");
        let tree = deployer.tree().unwrap();
        assert!(tree.find("web").unwrap().succeeded());
        assert!(tree.find("missing").unwrap().failed());
    }

    #[tokio::test]
    async fn test_set_tree() {
        let host = RegistryHost::new();
        host.register_ok("web");
        let mut deployer = deployer(host);
        deployer.set_tree(
            ConfigurationTree::from_json(r#"{ "configurations": [ { "name": "web" } ] }"#)
                .unwrap(),
        );

        let (tx, rx) = oneshot::channel();
        deployer.start(tx);

        assert!(rx.await.unwrap().is_ok());
        assert!(deployer.tree().unwrap().units()[0].succeeded());
    }
}
