use deployment_service::{
    ConfigurationTree, DeploymentOrchestrator, OrchestratorConfig, RegistryHost,
};

use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let json = r#"
{
  "configurations": [
    {
      "name": "database",
      "deploymentOptions": { "instances": 2 },
      "dependents": [
        { "configurations": [ { "name": "api" }, { "name": "worker" } ] },
        { "configurations": [ { "name": "missing-cache" } ] }
      ]
    },
    { "name": "metrics" }
  ]
}
"#;

    let tree = ConfigurationTree::from_json(json).expect("Failed to parse");
    println!("✓ Units in tree: {}", tree.len());

    let host = Arc::new(RegistryHost::new());
    host.register("database", |_| async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(())
    });
    host.register_ok("api").register_ok("worker").register_ok("metrics");

    let orchestrator = DeploymentOrchestrator::new(host.clone()).with_config(OrchestratorConfig {
        mark_skipped: true,
        ..Default::default()
    });

    println!("\n🚀 Starting units...\n");
    match orchestrator.run(&tree).await {
        Ok(()) => println!("✅ All units started"),
        Err(e) => println!("❌ Startup failed: {}", e),
    }

    // Give in-flight siblings a moment to land before reporting
    tokio::time::sleep(Duration::from_millis(50)).await;

    for (unit, depth) in tree.descriptors() {
        println!(
            "{}{} -> {}",
            "  ".repeat(depth),
            unit.identifier(),
            unit.state().label()
        );
    }
}
