//! In-memory compute provisioner
//!
//! Backs dry runs and the test-suite. Units are plain entries in a map;
//! `create` is create-or-get under one lock, which is what concurrent
//! `ensure` calls for the same guid converge on.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

use super::provisioner::{ComputeProvisioner, ComputeStatus, ComputeUnitSpec};

struct UnitState {
    #[allow(dead_code)]
    spec: ComputeUnitSpec,
    status: ComputeStatus,
}

/// Provisioner that only records units in memory
#[derive(Default)]
pub struct InMemoryProvisioner {
    units: Mutex<HashMap<String, UnitState>>,
    create_calls: AtomicUsize,
    /// When set, freshly created units report Running on the next poll,
    /// mimicking a platform that provisions quickly
    auto_run: bool,
}

impl InMemoryProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_auto_run() -> Self {
        Self {
            auto_run: true,
            ..Self::default()
        }
    }

    /// Total create invocations, including no-op create-or-get hits
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of distinct units provisioned
    pub async fn unit_count(&self) -> usize {
        self.units.lock().await.len()
    }

    /// Force a unit's status (test hook for failure injection)
    pub async fn set_status(&self, compute_unit_id: &str, status: ComputeStatus) {
        if let Some(unit) = self.units.lock().await.get_mut(compute_unit_id) {
            unit.status = status;
        }
    }

    /// The environment a unit was created with
    pub async fn unit_env(&self, compute_unit_id: &str) -> Option<Vec<(String, String)>> {
        self.units
            .lock()
            .await
            .get(compute_unit_id)
            .map(|u| u.spec.env.clone())
    }
}

#[async_trait]
impl ComputeProvisioner for InMemoryProvisioner {
    async fn create(&self, spec: ComputeUnitSpec) -> anyhow::Result<String> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        let mut units = self.units.lock().await;
        let id = spec.compute_unit_id.clone();
        units.entry(id.clone()).or_insert(UnitState {
            spec,
            status: ComputeStatus::Provisioning,
        });

        Ok(id)
    }

    async fn status(&self, compute_unit_id: &str) -> anyhow::Result<ComputeStatus> {
        let mut units = self.units.lock().await;
        match units.get_mut(compute_unit_id) {
            Some(unit) => {
                if self.auto_run && unit.status == ComputeStatus::Provisioning {
                    unit.status = ComputeStatus::Running;
                }
                Ok(unit.status.clone())
            },
            None => Ok(ComputeStatus::Provisioning),
        }
    }

    async fn stop(&self, compute_unit_id: &str) -> anyhow::Result<()> {
        if let Some(unit) = self.units.lock().await.get_mut(compute_unit_id) {
            unit.status = ComputeStatus::Stopped;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(id: &str) -> ComputeUnitSpec {
        ComputeUnitSpec {
            compute_unit_id: id.to_string(),
            image: "relay-worker".to_string(),
            env: vec![("RELAY_INTERFACE_NAME".to_string(), "orders".to_string())],
        }
    }

    #[tokio::test]
    async fn test_create_is_create_or_get() {
        let provisioner = InMemoryProvisioner::new();
        provisioner.create(spec("rly-aaa")).await.unwrap();
        provisioner.create(spec("rly-aaa")).await.unwrap();

        assert_eq!(provisioner.create_calls(), 2);
        assert_eq!(provisioner.unit_count().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_unit_reads_as_provisioning() {
        let provisioner = InMemoryProvisioner::new();
        assert_eq!(
            provisioner.status("rly-nothing").await.unwrap(),
            ComputeStatus::Provisioning
        );
    }

    #[tokio::test]
    async fn test_stop_is_noop_for_unknown_units() {
        let provisioner = InMemoryProvisioner::new();
        provisioner.stop("rly-nothing").await.unwrap();
    }

    #[tokio::test]
    async fn test_auto_run_advances_on_poll() {
        let provisioner = InMemoryProvisioner::with_auto_run();
        provisioner.create(spec("rly-bbb")).await.unwrap();
        assert_eq!(
            provisioner.status("rly-bbb").await.unwrap(),
            ComputeStatus::Running
        );
    }
}
