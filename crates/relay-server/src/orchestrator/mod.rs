//! Adapter instance orchestrator
//!
//! Maps one adapter instance (identified by its guid) to exactly one
//! compute unit and reports its lifecycle status. Idempotency comes from
//! deterministic naming, not from locks: concurrent `ensure` calls for
//! one guid derive the same compute unit id and converge on one unit via
//! the provisioner's create-or-get.

pub mod memory;
pub mod naming;
pub mod process;
pub mod provisioner;

pub use naming::compute_unit_id;
pub use provisioner::{ComputeProvisioner, ComputeStatus, ComputeUnitSpec};

use std::sync::Arc;
use thiserror::Error;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

use relay_broker::adapters::{validate_instance_config, AdapterConfigError};
use relay_broker::config_store::AdapterConfigStore;
use relay_broker::instance_store::InstanceStore;
use relay_broker::types::AdapterInstance;
use relay_broker::BrokerError;
use relay_common::types::env::SETTING_PREFIX;
use relay_common::AdapterIdentity;

/// Orchestrator failures
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Adapter instance not found: {0}")]
    InstanceNotFound(Uuid),

    #[error("Adapter instance is disabled: {0}")]
    InstanceDisabled(Uuid),

    #[error("Instance configuration invalid: {0}")]
    InvalidConfig(#[from] AdapterConfigError),

    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Provisioner error: {0}")]
    Provisioner(anyhow::Error),
}

impl From<anyhow::Error> for OrchestratorError {
    fn from(e: anyhow::Error) -> Self {
        Self::Provisioner(e)
    }
}

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Worker image or binary handed to the provisioner
    pub worker_image: String,
    /// Initial delay between status polls in `wait_until_running`
    pub poll_initial_ms: u64,
    /// Poll delay ceiling
    pub poll_max_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            worker_image: "relay-worker".to_string(),
            poll_initial_ms: 100,
            poll_max_ms: 2_000,
        }
    }
}

/// Deterministic, idempotent lifecycle management of per-adapter compute
/// workers
pub struct AdapterInstanceOrchestrator {
    provisioner: Arc<dyn ComputeProvisioner>,
    instances: Arc<dyn InstanceStore>,
    configs: Arc<dyn AdapterConfigStore>,
    config: OrchestratorConfig,
}

impl AdapterInstanceOrchestrator {
    pub fn new(
        provisioner: Arc<dyn ComputeProvisioner>,
        instances: Arc<dyn InstanceStore>,
        configs: Arc<dyn AdapterConfigStore>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            provisioner,
            instances,
            configs,
            config,
        }
    }

    /// Create-or-get the compute unit for an instance.
    ///
    /// Validates the instance's settings bag against its adapter kind,
    /// then provisions a unit named deterministically from the guid.
    /// Repeated and concurrent calls converge on the same unit.
    pub async fn ensure(&self, guid: Uuid) -> Result<String, OrchestratorError> {
        let instance = self
            .instances
            .get_instance(guid)
            .await?
            .ok_or(OrchestratorError::InstanceNotFound(guid))?;

        if !instance.is_enabled {
            return Err(OrchestratorError::InstanceDisabled(guid));
        }

        let settings = self
            .configs
            .settings(&instance.adapter_name, instance.adapter_type)
            .await?;
        validate_instance_config(&instance.adapter_name, instance.adapter_type, &settings)?;

        let unit_id = compute_unit_id(guid);
        let spec = ComputeUnitSpec {
            compute_unit_id: unit_id.clone(),
            image: self.config.worker_image.clone(),
            env: build_env(&instance, &settings),
        };

        self.provisioner.create(spec).await?;
        self.instances.set_compute_unit(guid, &unit_id).await?;

        info!(
            instance_guid = %guid,
            compute_unit_id = %unit_id,
            adapter = %instance.adapter_name,
            "Compute unit ensured"
        );

        Ok(unit_id)
    }

    /// Pure status read for an instance's compute unit.
    ///
    /// Reports `Provisioning` for units the platform does not know yet;
    /// provisioning is asynchronous and callers poll with backoff.
    pub async fn status(&self, guid: Uuid) -> Result<ComputeStatus, OrchestratorError> {
        Ok(self.provisioner.status(&compute_unit_id(guid)).await?)
    }

    /// Poll with exponential backoff until the unit leaves the
    /// provisioning state or `max_wait` elapses.
    ///
    /// Expiry is not a failure: the last observed status is returned, so
    /// a slow platform reads as "still provisioning".
    pub async fn wait_until_running(
        &self,
        guid: Uuid,
        max_wait: Duration,
    ) -> Result<ComputeStatus, OrchestratorError> {
        let deadline = Instant::now() + max_wait;
        let mut delay = Duration::from_millis(self.config.poll_initial_ms.max(1));
        let cap = Duration::from_millis(self.config.poll_max_ms.max(1));

        loop {
            let status = self.status(guid).await?;
            if status != ComputeStatus::Provisioning {
                return Ok(status);
            }
            if Instant::now() + delay > deadline {
                debug!(instance_guid = %guid, "Still provisioning at max wait");
                return Ok(status);
            }

            sleep(delay).await;
            delay = (delay * 2).min(cap);
        }
    }

    /// Stop the instance's compute unit and disable the instance.
    ///
    /// Safe to call for instances that were never successfully
    /// provisioned: stopping an unknown unit is a no-op.
    pub async fn teardown(&self, guid: Uuid) -> Result<(), OrchestratorError> {
        self.instances.set_enabled(guid, false).await?;
        self.provisioner.stop(&compute_unit_id(guid)).await?;

        info!(instance_guid = %guid, "Compute unit torn down");
        Ok(())
    }
}

/// Identity plus resolved settings, as the worker environment
fn build_env(
    instance: &AdapterInstance,
    settings: &std::collections::HashMap<String, String>,
) -> Vec<(String, String)> {
    let identity = AdapterIdentity {
        instance_guid: instance.instance_guid,
        interface_name: instance.interface_name.clone(),
        instance_name: instance.instance_name.clone(),
        adapter_name: instance.adapter_name.clone(),
        adapter_type: instance.adapter_type,
    };

    let mut env = identity.to_env();
    for (key, value) in settings {
        env.push((format!("{}{}", SETTING_PREFIX, key.to_uppercase()), value.clone()));
    }
    env
}

#[cfg(test)]
mod tests {
    use super::memory::InMemoryProvisioner;
    use super::*;
    use chrono::Utc;
    use futures::future::join_all;
    use relay_broker::memory::{InMemoryConfigStore, InMemoryInstanceStore};
    use relay_common::AdapterType;

    async fn orchestrator_with_instance(
    ) -> (AdapterInstanceOrchestrator, Arc<InMemoryProvisioner>, Uuid) {
        let provisioner = Arc::new(InMemoryProvisioner::with_auto_run());
        let instances = Arc::new(InMemoryInstanceStore::new());
        let configs = Arc::new(InMemoryConfigStore::new());

        configs
            .put("jsonl-file", AdapterType::Destination, "output_path", "/tmp/out.jsonl")
            .await
            .unwrap();

        let guid = Uuid::new_v4();
        let now = Utc::now();
        instances
            .upsert_instance(AdapterInstance {
                instance_guid: guid,
                interface_name: "orders".to_string(),
                instance_name: "orders-out".to_string(),
                adapter_name: "jsonl-file".to_string(),
                adapter_type: AdapterType::Destination,
                is_enabled: true,
                compute_unit_id: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let orchestrator = AdapterInstanceOrchestrator::new(
            provisioner.clone(),
            instances,
            configs,
            OrchestratorConfig {
                poll_initial_ms: 1,
                poll_max_ms: 5,
                ..OrchestratorConfig::default()
            },
        );

        (orchestrator, provisioner, guid)
    }

    #[tokio::test]
    async fn test_ensure_provisions_once_and_records_unit() {
        let (orchestrator, provisioner, guid) = orchestrator_with_instance().await;

        let first = orchestrator.ensure(guid).await.unwrap();
        let second = orchestrator.ensure(guid).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, compute_unit_id(guid));
        assert_eq!(provisioner.unit_count().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ensure_converges_on_one_unit() {
        let (orchestrator, provisioner, guid) = orchestrator_with_instance().await;
        let orchestrator = Arc::new(orchestrator);

        let calls = (0..16).map(|_| {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.ensure(guid).await.unwrap() })
        });

        let ids: Vec<String> = join_all(calls)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(provisioner.unit_count().await, 1);
    }

    #[tokio::test]
    async fn test_ensure_injects_identity_and_settings() {
        let (orchestrator, provisioner, guid) = orchestrator_with_instance().await;

        let unit_id = orchestrator.ensure(guid).await.unwrap();
        let env = provisioner.unit_env(&unit_id).await.unwrap();

        let get = |key: &str| {
            env.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };
        assert_eq!(get("RELAY_INSTANCE_GUID"), Some(guid.to_string()));
        assert_eq!(get("RELAY_ADAPTER_TYPE"), Some("destination".to_string()));
        assert_eq!(get("RELAY_SETTING_OUTPUT_PATH"), Some("/tmp/out.jsonl".to_string()));
    }

    #[tokio::test]
    async fn test_ensure_rejects_invalid_settings() {
        let provisioner = Arc::new(InMemoryProvisioner::new());
        let instances = Arc::new(InMemoryInstanceStore::new());
        let configs = Arc::new(InMemoryConfigStore::new());

        let guid = Uuid::new_v4();
        let now = Utc::now();
        instances
            .upsert_instance(AdapterInstance {
                instance_guid: guid,
                interface_name: "orders".to_string(),
                instance_name: "orders-out".to_string(),
                adapter_name: "jsonl-file".to_string(),
                adapter_type: AdapterType::Destination,
                is_enabled: true,
                compute_unit_id: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let orchestrator = AdapterInstanceOrchestrator::new(
            provisioner.clone(),
            instances,
            configs,
            OrchestratorConfig::default(),
        );

        // output_path was never configured
        let err = orchestrator.ensure(guid).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidConfig(_)));
        assert_eq!(provisioner.unit_count().await, 0);
    }

    #[tokio::test]
    async fn test_status_of_unprovisioned_instance_is_provisioning() {
        let (orchestrator, _provisioner, guid) = orchestrator_with_instance().await;
        assert_eq!(
            orchestrator.status(guid).await.unwrap(),
            ComputeStatus::Provisioning
        );
    }

    #[tokio::test]
    async fn test_wait_until_running_reports_still_provisioning_at_expiry() {
        let provisioner = Arc::new(InMemoryProvisioner::new());
        let instances = Arc::new(InMemoryInstanceStore::new());
        let configs = Arc::new(InMemoryConfigStore::new());
        let orchestrator = AdapterInstanceOrchestrator::new(
            provisioner,
            instances,
            configs,
            OrchestratorConfig {
                poll_initial_ms: 1,
                poll_max_ms: 2,
                ..OrchestratorConfig::default()
            },
        );

        // Never provisioned: status stays provisioning and the wait
        // expires without turning into a failure
        let status = orchestrator
            .wait_until_running(Uuid::new_v4(), Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(status, ComputeStatus::Provisioning);
    }

    #[tokio::test]
    async fn test_wait_until_running_observes_transition() {
        let (orchestrator, _provisioner, guid) = orchestrator_with_instance().await;
        orchestrator.ensure(guid).await.unwrap();

        // Auto-run provisioner flips to Running on the first poll
        let status = orchestrator
            .wait_until_running(guid, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(status, ComputeStatus::Running);
    }

    #[tokio::test]
    async fn test_teardown_is_safe_for_never_provisioned_instances() {
        let (orchestrator, _provisioner, guid) = orchestrator_with_instance().await;
        orchestrator.teardown(guid).await.unwrap();
    }

    #[tokio::test]
    async fn test_teardown_stops_unit_and_disables_instance() {
        let (orchestrator, provisioner, guid) = orchestrator_with_instance().await;
        let unit_id = orchestrator.ensure(guid).await.unwrap();

        orchestrator.teardown(guid).await.unwrap();
        assert_eq!(
            provisioner.status(&unit_id).await.unwrap(),
            ComputeStatus::Stopped
        );

        // Disabled instances cannot be re-ensured until re-enabled
        let err = orchestrator.ensure(guid).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::InstanceDisabled(_)));
    }
}
