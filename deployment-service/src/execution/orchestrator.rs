// Deployment Orchestrator
// Launches units in dependency order and reports one aggregate outcome

use crate::error::{ServiceError, ServiceResult, StartFailure};
use crate::execution::completion::CompletionState;
use crate::execution::events::{DeploymentEvent, EventSender, ProgressSender};
use crate::execution::tracker::AggregateTracker;
use crate::hosts::DeploymentHost;
use crate::tree::{ConfigurationTree, UnitDescriptor};

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinError;

/// Configuration for a run
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    /// Maximum concurrent host start calls across the tree (0 = unlimited)
    pub max_parallel_starts: usize,
    /// Settle descendants of a failed unit as `Skipped` instead of leaving them pending
    pub mark_skipped: bool,
}

/// Starts a configuration tree against a host
///
/// A unit's dependents are launched only after its own success has been
/// recorded on its completion handle. Siblings, and units in unrelated
/// branches, start concurrently in no particular order. A failure stops its
/// own branch but never cancels launches already issued elsewhere.
pub struct DeploymentOrchestrator {
    host: Arc<dyn DeploymentHost>,
    config: OrchestratorConfig,
    event_tx: Option<ProgressSender>,
}

impl DeploymentOrchestrator {
    pub fn new(host: Arc<dyn DeploymentHost>) -> Self {
        Self {
            host,
            config: OrchestratorConfig::default(),
            event_tx: None,
        }
    }

    /// Set orchestrator configuration
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set progress event sender
    pub fn with_progress(mut self, tx: ProgressSender) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Start every unit of `tree`
    ///
    /// Resolves `Ok` once every descriptor succeeded, or with the first start
    /// failure observed. Returning early on failure leaves in-flight launches
    /// running; their outcomes still land on the descriptors.
    pub async fn run(&self, tree: &ConfigurationTree) -> ServiceResult<()> {
        tree.begin_run()?;

        let start = Instant::now();
        self.event_tx.send_event(DeploymentEvent::run_started(tree.len()));

        // Enumerate before the first launch so no settlement is missed
        let tracker = AggregateTracker::watch(tree);

        let launcher = Launcher {
            host: Arc::clone(&self.host),
            event_tx: self.event_tx.clone(),
            limiter: (self.config.max_parallel_starts > 0)
                .then(|| Arc::new(Semaphore::new(self.config.max_parallel_starts))),
            mark_skipped: self.config.mark_skipped,
        };
        for unit in tree.units() {
            launcher.clone().spawn(Arc::clone(unit), 0);
        }

        let outcome = tracker.wait().await;

        let duration = start.elapsed();
        match &outcome {
            Ok(()) => tracing::info!(
                "all {} units started in {:.2}s",
                tree.len(),
                duration.as_secs_f64()
            ),
            Err(cause) => tracing::warn!("one or more units failed to start: {}", cause),
        }
        self.event_tx
            .send_event(DeploymentEvent::run_completed(outcome.is_ok(), duration));

        outcome.map_err(ServiceError::from)
    }
}

/// Per-run state shared by every launch task
#[derive(Clone)]
struct Launcher {
    host: Arc<dyn DeploymentHost>,
    event_tx: Option<ProgressSender>,
    limiter: Option<Arc<Semaphore>>,
    mark_skipped: bool,
}

impl Launcher {
    fn spawn(self, unit: Arc<UnitDescriptor>, depth: usize) {
        tokio::spawn(async move { self.launch(unit, depth).await });
    }

    async fn launch(self, unit: Arc<UnitDescriptor>, depth: usize) {
        let identifier = unit.identifier();
        tracing::debug!("starting {}", identifier);
        self.event_tx
            .send_event(DeploymentEvent::unit_starting(identifier, depth));

        let start = Instant::now();
        let result = {
            // Held for the host call only, never while dependents run
            let _permit = match &self.limiter {
                Some(limiter) => Arc::clone(limiter).acquire_owned().await.ok(),
                None => None,
            };
            // A panicking host must still settle the unit
            let host = Arc::clone(&self.host);
            let target = Arc::clone(&unit);
            let call = tokio::spawn(async move {
                host.start(target.identifier(), target.options()).await
            });
            match call.await {
                Ok(result) => result,
                Err(err) => Err(StartFailure::initialization(
                    identifier,
                    describe_join_error(err),
                )),
            }
        };
        let duration = start.elapsed();

        // Events go out before the handle settles so that they always precede
        // the run's completion event
        match result {
            Ok(instance_id) => {
                tracing::info!("started {} as {}", identifier, instance_id);
                self.event_tx.send_event(DeploymentEvent::unit_started(
                    identifier,
                    instance_id.clone(),
                    duration,
                ));
                unit.completion().settle(CompletionState::Succeeded { instance_id });

                for group in unit.dependent_groups() {
                    for child in group.units() {
                        self.clone().spawn(Arc::clone(child), depth + 1);
                    }
                }
            }
            Err(cause) => {
                tracing::warn!("starting {} failed: {}", identifier, cause);
                self.event_tx.send_event(DeploymentEvent::unit_failed(
                    identifier,
                    cause.clone(),
                    duration,
                ));

                if self.mark_skipped {
                    let reason = format!("'{}' failed to start", identifier);
                    self.skip_dependents(&unit, &reason);
                }
                unit.completion().settle(CompletionState::Failed { cause });
            }
        }
    }

    fn skip_dependents(&self, unit: &UnitDescriptor, reason: &str) {
        for group in unit.dependent_groups() {
            for child in group.units() {
                if child.completion().settle(CompletionState::Skipped {
                    reason: reason.to_string(),
                }) {
                    tracing::debug!("skipping {}: {}", child.identifier(), reason);
                    self.event_tx
                        .send_event(DeploymentEvent::unit_skipped(child.identifier(), reason));
                }
                self.skip_dependents(child, reason);
            }
        }
    }
}

fn describe_join_error(err: JoinError) -> String {
    if !err.is_panic() {
        return "start task was cancelled".to_string();
    }
    let payload = err.into_panic();
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("host panicked while starting unit: {}", detail)
}
