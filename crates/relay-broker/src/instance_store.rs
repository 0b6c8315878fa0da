//! Adapter instance registry contract

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::BrokerResult;
use crate::types::AdapterInstance;

#[async_trait]
pub trait InstanceStore: Send + Sync {
    /// Insert or update an instance, keyed by its guid
    async fn upsert_instance(&self, instance: AdapterInstance) -> BrokerResult<AdapterInstance>;

    async fn get_instance(&self, guid: Uuid) -> BrokerResult<Option<AdapterInstance>>;

    /// All instances, optionally filtered to one interface
    async fn list_instances(
        &self,
        interface_name: Option<&str>,
    ) -> BrokerResult<Vec<AdapterInstance>>;

    /// Record the compute unit an instance is running in; returns whether
    /// the instance existed
    async fn set_compute_unit(&self, guid: Uuid, compute_unit_id: &str) -> BrokerResult<bool>;

    /// Enable or disable an instance; returns whether it existed
    async fn set_enabled(&self, guid: Uuid, enabled: bool) -> BrokerResult<bool>;
}
