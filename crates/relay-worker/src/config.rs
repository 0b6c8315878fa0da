//! Worker configuration from the orchestrator-injected environment

use anyhow::{Context, Result};
use std::collections::HashMap;

use relay_broker::config_store::AdapterConfigStore;
use relay_common::types::env;
use relay_common::{AdapterIdentity, AdapterType};

/// Identity and setting overrides of this worker process
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub identity: AdapterIdentity,
    /// Per-instance overrides from `RELAY_SETTING_*` variables, keys
    /// lowercased to match the settings bag
    pub setting_overrides: HashMap<String, String>,
}

impl WorkerConfig {
    /// Read the identity contract from the environment.
    ///
    /// All five identity variables are required; a worker without a full
    /// identity must not touch the broker.
    pub fn from_env() -> Result<Self> {
        let instance_guid = require(env::INSTANCE_GUID)?
            .parse()
            .context("RELAY_INSTANCE_GUID is not a valid UUID")?;
        let adapter_type: AdapterType = require(env::ADAPTER_TYPE)?
            .parse()
            .context("RELAY_ADAPTER_TYPE must be 'source' or 'destination'")?;

        let identity = AdapterIdentity {
            instance_guid,
            interface_name: require(env::INTERFACE_NAME)?,
            instance_name: require(env::INSTANCE_NAME)?,
            adapter_name: require(env::ADAPTER_NAME)?,
            adapter_type,
        };

        let setting_overrides = std::env::vars()
            .filter_map(|(key, value)| {
                key.strip_prefix(env::SETTING_PREFIX)
                    .map(|setting| (setting.to_lowercase(), value))
            })
            .collect();

        Ok(Self {
            identity,
            setting_overrides,
        })
    }

    /// Resolve the effective settings bag: the adapter kind's stored
    /// settings with the instance's environment overrides layered on top.
    pub async fn resolve_settings(
        &self,
        store: &dyn AdapterConfigStore,
    ) -> Result<HashMap<String, String>> {
        let mut settings = store
            .settings(&self.identity.adapter_name, self.identity.adapter_type)
            .await
            .context("Failed to read adapter settings")?;

        for (key, value) in &self.setting_overrides {
            settings.insert(key.clone(), value.clone());
        }

        Ok(settings)
    }
}

fn require(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{key} not set"))
}
