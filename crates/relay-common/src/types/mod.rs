//! Common domain types used across Relay

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RelayError;

/// Whether an adapter produces records into the broker or consumes them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterType {
    Source,
    Destination,
}

impl AdapterType {
    pub fn as_str(&self) -> &str {
        match self {
            AdapterType::Source => "source",
            AdapterType::Destination => "destination",
        }
    }
}

impl std::str::FromStr for AdapterType {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "source" => Ok(AdapterType::Source),
            "destination" => Ok(AdapterType::Destination),
            other => Err(RelayError::InvalidAdapterType(other.to_string())),
        }
    }
}

impl std::fmt::Display for AdapterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one configured adapter instance.
///
/// The orchestrator injects this into each compute unit as environment
/// variables (see the `env` module); the worker reads it back at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterIdentity {
    pub instance_guid: Uuid,
    pub interface_name: String,
    pub instance_name: String,
    pub adapter_name: String,
    pub adapter_type: AdapterType,
}

/// Environment variable contract between the orchestrator and the worker
pub mod env {
    /// Adapter instance guid (UUID)
    pub const INSTANCE_GUID: &str = "RELAY_INSTANCE_GUID";
    /// Interface the instance is bound to
    pub const INTERFACE_NAME: &str = "RELAY_INTERFACE_NAME";
    /// Human-readable instance name
    pub const INSTANCE_NAME: &str = "RELAY_INSTANCE_NAME";
    /// Adapter kind name (e.g. "delimited-file")
    pub const ADAPTER_NAME: &str = "RELAY_ADAPTER_NAME";
    /// "source" or "destination"
    pub const ADAPTER_TYPE: &str = "RELAY_ADAPTER_TYPE";
    /// Prefix for per-instance setting overrides, e.g.
    /// `RELAY_SETTING_INPUT_PATH` overrides the `input_path` setting.
    pub const SETTING_PREFIX: &str = "RELAY_SETTING_";
}

impl AdapterIdentity {
    /// Render the identity as the environment variable pairs injected into
    /// a compute unit.
    pub fn to_env(&self) -> Vec<(String, String)> {
        vec![
            (env::INSTANCE_GUID.to_string(), self.instance_guid.to_string()),
            (env::INTERFACE_NAME.to_string(), self.interface_name.clone()),
            (env::INSTANCE_NAME.to_string(), self.instance_name.clone()),
            (env::ADAPTER_NAME.to_string(), self.adapter_name.clone()),
            (env::ADAPTER_TYPE.to_string(), self.adapter_type.to_string()),
        ]
    }
}
