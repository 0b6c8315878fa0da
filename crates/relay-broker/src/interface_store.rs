//! Interface wiring store contract
//!
//! An interface binds one source adapter to one-or-many destination
//! adapters. The enabled destination set of an interface is the snapshot
//! source for subscription fan-out at publish time.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{BrokerError, BrokerResult};
use crate::types::{DestinationBinding, InterfaceConfiguration, NewInterface};

#[async_trait]
pub trait InterfaceStore: Send + Sync {
    async fn create_interface(&self, spec: NewInterface) -> BrokerResult<InterfaceConfiguration>;

    async fn get_interface(&self, name: &str) -> BrokerResult<Option<InterfaceConfiguration>>;

    async fn list_interfaces(&self) -> BrokerResult<Vec<InterfaceConfiguration>>;

    /// Enable or disable a whole interface; returns whether it existed
    async fn set_interface_enabled(&self, name: &str, enabled: bool) -> BrokerResult<bool>;

    /// Bind a destination adapter to an interface (enabled immediately)
    async fn add_destination(
        &self,
        interface_name: &str,
        destination_adapter_name: &str,
        destination_config: Option<Value>,
    ) -> BrokerResult<DestinationBinding>;

    /// Enable or disable one destination binding; returns whether it existed
    async fn set_destination_enabled(
        &self,
        interface_name: &str,
        destination_adapter_name: &str,
        enabled: bool,
    ) -> BrokerResult<bool>;

    /// All destination bindings of an interface, enabled or not
    async fn destinations(&self, interface_name: &str) -> BrokerResult<Vec<DestinationBinding>>;

    /// The currently enabled destination bindings — the publish snapshot
    async fn enabled_destinations(
        &self,
        interface_name: &str,
    ) -> BrokerResult<Vec<DestinationBinding>>;

    /// Remove an interface and its destination bindings; returns whether
    /// it existed
    async fn delete_interface(&self, name: &str) -> BrokerResult<bool>;
}

/// Check the interface invariant before enabling a destination: an
/// interface with any enabled destination must have an enabled,
/// resolvable source adapter.
pub fn check_destination_enable(
    interface: &InterfaceConfiguration,
    destination_adapter_name: &str,
) -> BrokerResult<()> {
    if !interface.is_enabled || interface.source_adapter_name.trim().is_empty() {
        return Err(BrokerError::SourcelessDestination {
            interface: interface.interface_name.clone(),
            destination: destination_adapter_name.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn interface(enabled: bool, source: &str) -> InterfaceConfiguration {
        InterfaceConfiguration {
            id: Uuid::new_v4(),
            interface_name: "orders".to_string(),
            source_adapter_name: source.to_string(),
            source_config: None,
            is_enabled: enabled,
            description: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_destination_requires_enabled_source() {
        assert!(check_destination_enable(&interface(true, "files-in"), "warehouse").is_ok());
        assert!(check_destination_enable(&interface(false, "files-in"), "warehouse").is_err());
        assert!(check_destination_enable(&interface(true, "  "), "warehouse").is_err());
    }
}
