//! MessageBox publish service
//!
//! Composes the message store with the interface store: publishing a
//! record snapshots the interface's *currently enabled* destination
//! bindings into subscription rows. The snapshot is taken at publish
//! time, not joined live — destinations enabled later do not
//! retroactively receive already-published messages.

use std::sync::Arc;
use tracing::{debug, warn};

use relay_common::typing::RecordPayload;
use relay_common::AdapterIdentity;

use crate::error::{BrokerError, BrokerResult};
use crate::interface_store::InterfaceStore;
use crate::message_store::MessageStore;
use crate::types::{NewMessage, PublishReceipt};

/// Handle through which source adapters publish normalized records
#[derive(Clone)]
pub struct MessageBox {
    store: Arc<dyn MessageStore>,
    interfaces: Arc<dyn InterfaceStore>,
}

impl MessageBox {
    pub fn new(store: Arc<dyn MessageStore>, interfaces: Arc<dyn InterfaceStore>) -> Self {
        Self { store, interfaces }
    }

    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    /// Publish one normalized record on behalf of a producing adapter
    /// instance.
    ///
    /// Fails if the interface does not exist or is disabled. A publish
    /// with zero enabled destinations succeeds; the message is then
    /// immediately eligible for garbage collection.
    pub async fn publish_record(
        &self,
        producer: &AdapterIdentity,
        payload: &RecordPayload,
    ) -> BrokerResult<PublishReceipt> {
        let interface = self
            .interfaces
            .get_interface(&producer.interface_name)
            .await?
            .ok_or_else(|| BrokerError::InterfaceNotFound(producer.interface_name.clone()))?;

        if !interface.is_enabled {
            return Err(BrokerError::InterfaceDisabled(interface.interface_name));
        }

        let destinations = self
            .interfaces
            .enabled_destinations(&producer.interface_name)
            .await?;
        let subscribers: Vec<String> = destinations
            .into_iter()
            .map(|d| d.destination_adapter_name)
            .collect();

        if subscribers.is_empty() {
            warn!(
                interface = %producer.interface_name,
                "Publishing with zero enabled destinations; message will be garbage-collected unconsumed"
            );
        }

        let receipt = self
            .store
            .publish(
                NewMessage {
                    interface_name: producer.interface_name.clone(),
                    producing_adapter_name: producer.adapter_name.clone(),
                    producing_adapter_type: producer.adapter_type,
                    payload: payload.to_json(),
                    payload_checksum: Some(payload.checksum()),
                },
                &subscribers,
            )
            .await?;

        debug!(
            message_id = %receipt.message_id,
            interface = %producer.interface_name,
            subscriptions = receipt.subscription_ids.len(),
            "Message published"
        );

        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_common::typing::{ColumnSchema, SqlType};
    use relay_common::AdapterType;

    use crate::interface_store::InterfaceStore;
    use crate::memory::{InMemoryInterfaceStore, InMemoryMessageStore};
    use crate::types::NewInterface;

    fn producer(interface: &str) -> AdapterIdentity {
        AdapterIdentity {
            instance_guid: uuid::Uuid::new_v4(),
            interface_name: interface.to_string(),
            instance_name: "in".to_string(),
            adapter_name: "delimited-file".to_string(),
            adapter_type: AdapterType::Source,
        }
    }

    fn payload() -> RecordPayload {
        let schema = vec![ColumnSchema {
            name: "id".to_string(),
            sql_type: SqlType::Int,
        }];
        RecordPayload::from_row(&schema, &["1"]).unwrap()
    }

    async fn wired_box() -> (MessageBox, Arc<InMemoryInterfaceStore>) {
        let interfaces = Arc::new(InMemoryInterfaceStore::new());
        interfaces
            .create_interface(NewInterface {
                interface_name: "orders".to_string(),
                source_adapter_name: "delimited-file".to_string(),
                source_config: None,
                description: None,
            })
            .await
            .unwrap();

        let message_box = MessageBox::new(
            Arc::new(InMemoryMessageStore::new()),
            interfaces.clone(),
        );
        (message_box, interfaces)
    }

    #[tokio::test]
    async fn test_publish_snapshots_enabled_destinations() {
        let (message_box, interfaces) = wired_box().await;
        interfaces
            .add_destination("orders", "warehouse", None)
            .await
            .unwrap();
        interfaces
            .add_destination("orders", "billing", None)
            .await
            .unwrap();
        interfaces
            .set_destination_enabled("orders", "billing", false)
            .await
            .unwrap();

        let receipt = message_box
            .publish_record(&producer("orders"), &payload())
            .await
            .unwrap();

        // Only the enabled destination got a subscription
        assert_eq!(receipt.subscription_ids.len(), 1);
        let subs = message_box
            .store()
            .subscriptions_for(receipt.message_id)
            .await
            .unwrap();
        assert_eq!(subs[0].subscriber_adapter_name, "warehouse");
    }

    #[tokio::test]
    async fn test_late_joining_destination_receives_nothing_retroactively() {
        let (message_box, interfaces) = wired_box().await;
        interfaces
            .add_destination("orders", "warehouse", None)
            .await
            .unwrap();

        let first = message_box
            .publish_record(&producer("orders"), &payload())
            .await
            .unwrap();

        interfaces
            .add_destination("orders", "billing", None)
            .await
            .unwrap();

        let second = message_box
            .publish_record(&producer("orders"), &payload())
            .await
            .unwrap();

        assert_eq!(first.subscription_ids.len(), 1);
        assert_eq!(second.subscription_ids.len(), 2);
        assert!(message_box
            .store()
            .claim_pending("billing", 10)
            .await
            .unwrap()
            .iter()
            .all(|d| d.message_id == second.message_id));
    }

    #[tokio::test]
    async fn test_publish_to_unknown_or_disabled_interface_fails() {
        let (message_box, interfaces) = wired_box().await;

        let err = message_box
            .publish_record(&producer("missing"), &payload())
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::InterfaceNotFound(_)));

        interfaces
            .set_interface_enabled("orders", false)
            .await
            .unwrap();
        let err = message_box
            .publish_record(&producer("orders"), &payload())
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::InterfaceDisabled(_)));
    }
}
