//! Local process compute provisioner
//!
//! Runs one `relay-worker` child process per compute unit, with the
//! adapter identity and resolved settings injected as environment
//! variables. Suitable for single-host deployments; container platforms
//! implement the same [`ComputeProvisioner`] contract.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::provisioner::{ComputeProvisioner, ComputeStatus, ComputeUnitSpec};

/// Process provisioner settings
#[derive(Debug, Clone)]
pub struct ProcessProvisionerConfig {
    /// Worker binary to spawn; resolved via PATH when not absolute
    pub worker_binary: PathBuf,
    /// Connection string handed to every worker
    pub database_url: String,
}

/// Provisioner backed by local child processes
pub struct ProcessProvisioner {
    config: ProcessProvisionerConfig,
    children: Mutex<HashMap<String, Child>>,
}

impl ProcessProvisioner {
    pub fn new(config: ProcessProvisionerConfig) -> Self {
        Self {
            config,
            children: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ComputeProvisioner for ProcessProvisioner {
    async fn create(&self, spec: ComputeUnitSpec) -> anyhow::Result<String> {
        let mut children = self.children.lock().await;

        // Create-or-get: an existing child for this id is the unit
        if children.contains_key(&spec.compute_unit_id) {
            return Ok(spec.compute_unit_id);
        }

        let mut command = Command::new(&self.config.worker_binary);
        command
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .env("DATABASE_URL", &self.config.database_url)
            .kill_on_drop(true);

        let child = command.spawn()?;
        info!(
            compute_unit_id = %spec.compute_unit_id,
            pid = child.id(),
            "Worker process spawned"
        );
        children.insert(spec.compute_unit_id.clone(), child);

        Ok(spec.compute_unit_id)
    }

    async fn status(&self, compute_unit_id: &str) -> anyhow::Result<ComputeStatus> {
        let mut children = self.children.lock().await;

        match children.get_mut(compute_unit_id) {
            None => Ok(ComputeStatus::Provisioning),
            Some(child) => match child.try_wait()? {
                None => Ok(ComputeStatus::Running),
                Some(exit) if exit.success() => Ok(ComputeStatus::Stopped),
                Some(exit) => Ok(ComputeStatus::Failed(format!("worker exited: {exit}"))),
            },
        }
    }

    async fn stop(&self, compute_unit_id: &str) -> anyhow::Result<()> {
        let mut children = self.children.lock().await;

        if let Some(child) = children.get_mut(compute_unit_id) {
            if let Err(e) = child.start_kill() {
                // Already exited is fine; anything else is worth a note
                warn!(compute_unit_id, error = %e, "Failed to signal worker process");
            }
        }

        Ok(())
    }
}
