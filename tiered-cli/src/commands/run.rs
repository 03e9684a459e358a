use crate::output;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use color_eyre::Result;

use deployment_service::execution::events::progress_channel;
use deployment_service::{
    CommandHost, ConfigurationTree, DeploymentEvent, DeploymentOrchestrator, OrchestratorConfig,
    ServiceError,
};

/// Start every unit of a deployment description
///
/// Started processes are not stopped when the run fails or when tiered exits;
/// only `--hold` stops them, on Ctrl-C.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the deployment description (JSON or YAML)
    pub config: PathBuf,

    /// Maximum units starting at the same time (0 = unlimited)
    #[arg(long, default_value_t = 0, value_name = "N")]
    pub max_parallel: usize,

    /// Report units behind a failed unit as skipped instead of not started
    #[arg(long)]
    pub mark_skipped: bool,

    /// After a successful start, keep running until Ctrl-C and then stop all units.
    /// Without it, started processes keep running after tiered exits, also when
    /// the run fails
    #[arg(long)]
    pub hold: bool,

    /// Working directory for units that do not set one
    #[arg(long, short = 'w', value_name = "DIR")]
    pub working_dir: Option<PathBuf>,
}

pub async fn execute(args: RunArgs) -> Result<()> {
    let config_path = &args.config;

    if !config_path.exists() {
        color_eyre::eyre::bail!("Configuration file not found: {}", config_path.display());
    }

    output::status("Loading", &format!("{}", config_path.display()));
    let tree = ConfigurationTree::load(config_path)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load configuration: {}", e))?;
    let tree = Arc::new(tree);

    let working_dir = match &args.working_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    let host = Arc::new(CommandHost::new().with_working_dir(working_dir));

    let (tx, mut rx) = progress_channel();
    let orchestrator = DeploymentOrchestrator::new(host.clone())
        .with_config(OrchestratorConfig {
            max_parallel_starts: args.max_parallel,
            mark_skipped: args.mark_skipped,
        })
        .with_progress(tx);

    // Spawn the run in background
    let run_tree = Arc::clone(&tree);
    let run_handle = tokio::spawn(async move { orchestrator.run(&run_tree).await });

    // Process events in the foreground
    while let Some(event) = rx.recv().await {
        match event {
            DeploymentEvent::RunStarted { total_units } => {
                println!();
                output::header(&format!("Starting {} units", total_units));
            }
            DeploymentEvent::UnitStarting { identifier, depth } => {
                output::status("Starting", &format!("{}{}", "  ".repeat(depth), identifier));
            }
            DeploymentEvent::UnitStarted {
                identifier,
                instance_id,
                duration,
            } => {
                output::check(&format!(
                    "{} started as {} ({:.2}s)",
                    identifier,
                    instance_id,
                    duration.as_secs_f64()
                ));
            }
            DeploymentEvent::UnitFailed {
                identifier, cause, ..
            } => {
                output::failure(&format!("{}: {}", identifier, cause));
            }
            DeploymentEvent::UnitSkipped { identifier, reason } => {
                output::not_started(&format!("{} skipped: {}", identifier, reason));
            }
            DeploymentEvent::RunCompleted { success, duration } => {
                println!();
                if success {
                    output::success(&format!(
                        "All units started in {:.2}s",
                        duration.as_secs_f64()
                    ));
                } else {
                    output::failure(&format!(
                        "Startup failed after {:.2}s",
                        duration.as_secs_f64()
                    ));
                }
                // Launches still in flight keep running but are not reported
                break;
            }
        }
    }

    let outcome = run_handle.await?;

    println!();
    output::header("Summary");
    let summary = tree.summary();
    output::summary(&summary);
    output::info(&format!(
        "{} succeeded, {} failed, {} skipped, {} not started",
        summary.succeeded(),
        summary.failed(),
        summary.skipped(),
        summary.pending()
    ));

    match outcome {
        Ok(()) => {}
        Err(ServiceError::Start(cause)) => {
            output::error(&cause.to_string());
            if !host.running().is_empty() {
                output::warning(&format!(
                    "{} started units keep running after exit; stop them manually",
                    host.running().len()
                ));
            }
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    }

    if args.hold {
        output::info("Holding; press Ctrl-C to stop all units");
        tokio::signal::ctrl_c().await?;
        output::status("Stopping", &format!("{} units", host.running().len()));
        host.shutdown().await;
    }

    Ok(())
}
