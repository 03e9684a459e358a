// Command Host
// Starts units as operating system processes

use crate::config::DeploymentOptions;
use crate::error::{StartFailure, StartFailureKind};
use crate::hosts::{DeploymentHost, InstanceId};

use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Options understood by the command host
///
/// Unknown keys are ignored so the same description can carry options for
/// other hosts.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOptions {
    /// Arguments passed to the program
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment variables
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Working directory (defaults to the host's)
    pub working_dir: Option<PathBuf>,
    /// Treat the unit as one-shot: started means exited with status 0
    #[serde(default)]
    pub wait_for_exit: bool,
}

impl CommandOptions {
    fn from_options(
        identifier: &str,
        options: Option<&DeploymentOptions>,
    ) -> Result<Self, StartFailure> {
        match options {
            None => Ok(Self::default()),
            Some(options) => serde_json::from_value(serde_json::Value::Object(options.clone()))
                .map_err(|e| StartFailure::invalid_options(identifier, e.to_string())),
        }
    }
}

/// Host that runs each unit's identifier as a program
///
/// Long-running units are kept as child processes until `shutdown`.
/// Instance ids have the form `<program>#<pid>`.
#[derive(Default)]
pub struct CommandHost {
    working_dir: Option<PathBuf>,
    children: Mutex<Vec<(InstanceId, Child)>>,
}

impl CommandHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default working directory for units that do not set `workingDir`
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Instance ids of processes still owned by this host
    pub fn running(&self) -> Vec<InstanceId> {
        self.children.lock().iter().map(|(id, _)| id.clone()).collect()
    }

    /// Kill every retained process and wait for it to exit
    pub async fn shutdown(&self) {
        let children: Vec<_> = self.children.lock().drain(..).collect();
        for (instance_id, mut child) in children {
            match child.kill().await {
                Ok(()) => tracing::info!("stopped {}", instance_id),
                Err(e) => tracing::warn!("failed to stop {}: {}", instance_id, e),
            }
        }
    }

    fn build_command(&self, identifier: &str, options: &CommandOptions) -> Command {
        let mut cmd = Command::new(identifier);
        cmd.args(&options.args);
        cmd.envs(&options.env);
        if let Some(dir) = options.working_dir.as_ref().or(self.working_dir.as_ref()) {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null());
        if options.wait_for_exit {
            cmd.stdout(Stdio::null());
            cmd.stderr(Stdio::piped());
        }
        cmd
    }

    fn spawn_failure(identifier: &str, err: io::Error) -> StartFailure {
        let kind = if err.kind() == io::ErrorKind::NotFound {
            StartFailureKind::NotFound
        } else {
            StartFailureKind::Spawn
        };
        StartFailure::new(
            identifier,
            kind,
            format!("failed to spawn process '{}': {}", identifier, err),
        )
    }
}

#[async_trait::async_trait]
impl DeploymentHost for CommandHost {
    async fn start(
        &self,
        identifier: &str,
        options: Option<&DeploymentOptions>,
    ) -> Result<InstanceId, StartFailure> {
        let options = CommandOptions::from_options(identifier, options)?;
        let child = self
            .build_command(identifier, &options)
            .spawn()
            .map_err(|e| Self::spawn_failure(identifier, e))?;

        let instance_id = format!("{}#{}", identifier, child.id().unwrap_or_default());

        if options.wait_for_exit {
            let output = child.wait_with_output().await.map_err(|e| {
                StartFailure::new(identifier, StartFailureKind::Exited, e.to_string())
            })?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let mut message = format!("process exited with {}", output.status);
                if let Some(last) = stderr.lines().rev().find(|l| !l.trim().is_empty()) {
                    message.push_str(": ");
                    message.push_str(last.trim());
                }
                return Err(StartFailure::new(identifier, StartFailureKind::Exited, message));
            }
            tracing::debug!("{} ran to completion", instance_id);
            return Ok(instance_id);
        }

        self.children.lock().push((instance_id.clone(), child));
        Ok(instance_id)
    }
}
