use crate::output;

use std::path::PathBuf;

use clap::Args;
use color_eyre::Result;

use deployment_service::{ConfigError, ConfigLoader, ConfigurationTree};

/// Validate a deployment description without starting anything
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the deployment description (JSON or YAML)
    pub config: PathBuf,
}

pub fn execute(args: ValidateArgs) -> Result<()> {
    let config_path = &args.config;

    if !config_path.exists() {
        color_eyre::eyre::bail!("Configuration file not found: {}", config_path.display());
    }

    output::status("Validating", &format!("{}", config_path.display()));

    // Step 1: Parse syntax
    let set = match ConfigLoader::parse_file(config_path) {
        Ok(set) => set,
        Err(e) => {
            output::error(&e.to_string());
            std::process::exit(1);
        }
    };

    output::check("Syntax valid");

    // Step 2: Build the tree
    let tree = match ConfigurationTree::from_config(&set) {
        Ok(tree) => tree,
        Err(ConfigError::InvalidConfiguration { path, reason }) => {
            output::error(&format!("[{}] {}", path, reason));
            std::process::exit(1);
        }
        Err(e) => {
            output::error(&e.to_string());
            std::process::exit(1);
        }
    };

    if tree.is_empty() {
        output::warning("No units configured; a run would succeed without starting anything");
    } else {
        output::check(&format!(
            "Structure: {} top-level units, {} units in total, {} levels",
            tree.units().len(),
            tree.len(),
            tree.max_depth().map_or(0, |depth| depth + 1)
        ));
    }

    println!();
    output::success("Configuration is valid");

    Ok(())
}
