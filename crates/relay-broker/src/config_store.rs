//! Adapter settings store contract
//!
//! A generic key/value bag per (adapter name, adapter type), scoped
//! globally per adapter kind. Instance-specific overrides are layered on
//! top by the caller, never by this store — that keeps adapters
//! swappable: the orchestrator and the worker only ever read this bag,
//! never adapter-specific typed configuration.

use async_trait::async_trait;
use std::collections::HashMap;

use relay_common::AdapterType;

use crate::error::BrokerResult;
use crate::types::AdapterConfiguration;

#[async_trait]
pub trait AdapterConfigStore: Send + Sync {
    /// Active settings for one adapter kind, as a key → value map
    async fn settings(
        &self,
        adapter_name: &str,
        adapter_type: AdapterType,
    ) -> BrokerResult<HashMap<String, String>>;

    /// All rows (active and inactive) for one adapter kind
    async fn rows(
        &self,
        adapter_name: &str,
        adapter_type: AdapterType,
    ) -> BrokerResult<Vec<AdapterConfiguration>>;

    /// Insert or update one setting, reactivating it if it was inactive
    async fn put(
        &self,
        adapter_name: &str,
        adapter_type: AdapterType,
        setting_key: &str,
        setting_value: &str,
    ) -> BrokerResult<()>;

    /// Deactivate one setting; returns whether a row was affected
    async fn deactivate(
        &self,
        adapter_name: &str,
        adapter_type: AdapterType,
        setting_key: &str,
    ) -> BrokerResult<bool>;
}
