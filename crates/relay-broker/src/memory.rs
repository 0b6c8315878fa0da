//! In-memory store implementations
//!
//! Semantically identical to the PostgreSQL stores: publish is atomic
//! under one lock, subscription completion is conditional on the current
//! status, and the sweep evaluates its deletion predicate and removes
//! rows within a single critical section. Used by the test-suite and by
//! single-node dry runs.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use relay_common::AdapterType;

use crate::config_store::AdapterConfigStore;
use crate::error::{BrokerError, BrokerResult};
use crate::instance_store::InstanceStore;
use crate::interface_store::{check_destination_enable, InterfaceStore};
use crate::message_store::MessageStore;
use crate::types::{
    AdapterConfiguration, AdapterInstance, DeliveryOutcome, DestinationBinding,
    InterfaceConfiguration, MessageBoxMessage, MessageStatus, MessageSubscription, NewInterface,
    NewMessage, PendingDelivery, PublishReceipt, StatusCounts, SubscriptionStatus, SweepReport,
};

// ============================================================================
// MessageStore
// ============================================================================

#[derive(Default)]
struct MessageState {
    messages: HashMap<Uuid, MessageBoxMessage>,
    subscriptions: HashMap<Uuid, MessageSubscription>,
}

/// In-memory MessageBox store
#[derive(Default)]
pub struct InMemoryMessageStore {
    state: Mutex<MessageState>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn publish(
        &self,
        message: NewMessage,
        subscribers: &[String],
    ) -> BrokerResult<PublishReceipt> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let message_id = Uuid::new_v4();

        state.messages.insert(
            message_id,
            MessageBoxMessage {
                id: message_id,
                interface_name: message.interface_name.clone(),
                producing_adapter_name: message.producing_adapter_name,
                producing_adapter_type: message.producing_adapter_type,
                payload: message.payload,
                payload_checksum: message.payload_checksum,
                status: MessageStatus::Pending,
                error_message: None,
                created_at: now,
                processed_at: None,
            },
        );

        let mut subscription_ids = Vec::with_capacity(subscribers.len());
        for subscriber in subscribers {
            let subscription_id = Uuid::new_v4();
            state.subscriptions.insert(
                subscription_id,
                MessageSubscription {
                    id: subscription_id,
                    message_id,
                    interface_name: message.interface_name.clone(),
                    subscriber_adapter_name: subscriber.clone(),
                    status: SubscriptionStatus::Pending,
                    error_message: None,
                    processing_details: None,
                    created_at: now,
                    processed_at: None,
                },
            );
            subscription_ids.push(subscription_id);
        }

        // Production complete: the row set is persisted, mark the message
        // processed while still holding the lock.
        if let Some(msg) = state.messages.get_mut(&message_id) {
            msg.status = MessageStatus::Processed;
            msg.processed_at = Some(Utc::now());
        }

        Ok(PublishReceipt {
            message_id,
            subscription_ids,
        })
    }

    async fn claim_pending(
        &self,
        subscriber_adapter_name: &str,
        limit: i64,
    ) -> BrokerResult<Vec<PendingDelivery>> {
        let state = self.state.lock().await;

        let mut pending: Vec<&MessageSubscription> = state
            .subscriptions
            .values()
            .filter(|s| {
                s.subscriber_adapter_name == subscriber_adapter_name
                    && s.status == SubscriptionStatus::Pending
            })
            .filter(|s| {
                state
                    .messages
                    .get(&s.message_id)
                    .map(|m| m.status == MessageStatus::Processed)
                    .unwrap_or(false)
            })
            .collect();
        pending.sort_by_key(|s| (s.created_at, s.id));

        Ok(pending
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|s| PendingDelivery {
                subscription_id: s.id,
                message_id: s.message_id,
                interface_name: s.interface_name.clone(),
                payload: state
                    .messages
                    .get(&s.message_id)
                    .map(|m| m.payload.clone())
                    .unwrap_or(Value::Null),
            })
            .collect())
    }

    async fn complete_subscription(
        &self,
        subscription_id: Uuid,
        outcome: DeliveryOutcome,
    ) -> BrokerResult<bool> {
        let mut state = self.state.lock().await;

        let Some(subscription) = state.subscriptions.get_mut(&subscription_id) else {
            return Ok(false);
        };
        if subscription.status != SubscriptionStatus::Pending {
            return Ok(false);
        }

        match outcome {
            DeliveryOutcome::Processed { details } => {
                subscription.status = SubscriptionStatus::Processed;
                subscription.processing_details = details;
            },
            DeliveryOutcome::Error { message } => {
                subscription.status = SubscriptionStatus::Error;
                subscription.error_message = Some(message);
            },
        }
        subscription.processed_at = Some(Utc::now());

        Ok(true)
    }

    async fn retry_subscription(&self, subscription_id: Uuid) -> BrokerResult<bool> {
        let mut state = self.state.lock().await;

        let Some(subscription) = state.subscriptions.get_mut(&subscription_id) else {
            return Ok(false);
        };
        if subscription.status != SubscriptionStatus::Error {
            return Ok(false);
        }

        subscription.status = SubscriptionStatus::Pending;
        subscription.error_message = None;
        subscription.processed_at = None;

        Ok(true)
    }

    async fn sweep(&self) -> BrokerResult<SweepReport> {
        let mut state = self.state.lock().await;
        let mut report = SweepReport::default();

        let deletable: Vec<Uuid> = state
            .messages
            .values()
            .filter(|m| m.status == MessageStatus::Processed)
            .filter(|m| {
                state
                    .subscriptions
                    .values()
                    .filter(|s| s.message_id == m.id)
                    .all(|s| s.status == SubscriptionStatus::Processed)
            })
            .map(|m| m.id)
            .collect();

        for message_id in &deletable {
            state.messages.remove(message_id);
            let before = state.subscriptions.len();
            state.subscriptions.retain(|_, s| s.message_id != *message_id);
            report.subscriptions_deleted += (before - state.subscriptions.len()) as u64;
            report.messages_deleted += 1;
        }

        let retained: Vec<Uuid> = state
            .subscriptions
            .values()
            .filter(|s| s.status == SubscriptionStatus::Error)
            .map(|s| s.message_id)
            .collect();
        let mut retained_unique = retained;
        retained_unique.sort_unstable();
        retained_unique.dedup();
        report.messages_retained_error = retained_unique.len() as u64;

        Ok(report)
    }

    async fn get_message(&self, message_id: Uuid) -> BrokerResult<Option<MessageBoxMessage>> {
        let state = self.state.lock().await;
        Ok(state.messages.get(&message_id).cloned())
    }

    async fn subscriptions_for(
        &self,
        message_id: Uuid,
    ) -> BrokerResult<Vec<MessageSubscription>> {
        let state = self.state.lock().await;
        let mut subs: Vec<MessageSubscription> = state
            .subscriptions
            .values()
            .filter(|s| s.message_id == message_id)
            .cloned()
            .collect();
        subs.sort_by_key(|s| (s.created_at, s.id));
        Ok(subs)
    }

    async fn list_pending_messages(
        &self,
        interface_name: &str,
        subscriber_adapter_name: Option<&str>,
        limit: i64,
    ) -> BrokerResult<Vec<MessageBoxMessage>> {
        let state = self.state.lock().await;

        let mut messages: Vec<MessageBoxMessage> = state
            .messages
            .values()
            .filter(|m| m.interface_name == interface_name)
            .filter(|m| {
                state.subscriptions.values().any(|s| {
                    s.message_id == m.id
                        && s.status == SubscriptionStatus::Pending
                        && subscriber_adapter_name
                            .map_or(true, |name| s.subscriber_adapter_name == name)
                })
            })
            .cloned()
            .collect();
        messages.sort_by_key(|m| (m.created_at, m.id));
        messages.truncate(limit.max(0) as usize);

        Ok(messages)
    }

    async fn counts_by_status(&self, interface_name: &str) -> BrokerResult<StatusCounts> {
        let state = self.state.lock().await;
        let mut counts = StatusCounts::default();

        for subscription in state
            .subscriptions
            .values()
            .filter(|s| s.interface_name == interface_name)
        {
            match subscription.status {
                SubscriptionStatus::Pending => counts.pending += 1,
                SubscriptionStatus::Processed => counts.processed += 1,
                SubscriptionStatus::Error => counts.error += 1,
            }
        }

        Ok(counts)
    }
}

// ============================================================================
// AdapterConfigStore
// ============================================================================

type ConfigKey = (String, AdapterType, String);

/// In-memory adapter settings store
#[derive(Default)]
pub struct InMemoryConfigStore {
    rows: Mutex<HashMap<ConfigKey, AdapterConfiguration>>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AdapterConfigStore for InMemoryConfigStore {
    async fn settings(
        &self,
        adapter_name: &str,
        adapter_type: AdapterType,
    ) -> BrokerResult<HashMap<String, String>> {
        let rows = self.rows.lock().await;
        Ok(rows
            .values()
            .filter(|r| {
                r.adapter_name == adapter_name && r.adapter_type == adapter_type && r.is_active
            })
            .map(|r| (r.setting_key.clone(), r.setting_value.clone()))
            .collect())
    }

    async fn rows(
        &self,
        adapter_name: &str,
        adapter_type: AdapterType,
    ) -> BrokerResult<Vec<AdapterConfiguration>> {
        let rows = self.rows.lock().await;
        let mut result: Vec<AdapterConfiguration> = rows
            .values()
            .filter(|r| r.adapter_name == adapter_name && r.adapter_type == adapter_type)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.setting_key.cmp(&b.setting_key));
        Ok(result)
    }

    async fn put(
        &self,
        adapter_name: &str,
        adapter_type: AdapterType,
        setting_key: &str,
        setting_value: &str,
    ) -> BrokerResult<()> {
        let mut rows = self.rows.lock().await;
        let key = (
            adapter_name.to_string(),
            adapter_type,
            setting_key.to_string(),
        );
        let now = Utc::now();

        rows.entry(key)
            .and_modify(|row| {
                row.setting_value = setting_value.to_string();
                row.is_active = true;
                row.updated_at = now;
            })
            .or_insert_with(|| AdapterConfiguration {
                adapter_name: adapter_name.to_string(),
                adapter_type,
                setting_key: setting_key.to_string(),
                setting_value: setting_value.to_string(),
                is_active: true,
                created_at: now,
                updated_at: now,
            });

        Ok(())
    }

    async fn deactivate(
        &self,
        adapter_name: &str,
        adapter_type: AdapterType,
        setting_key: &str,
    ) -> BrokerResult<bool> {
        let mut rows = self.rows.lock().await;
        let key = (
            adapter_name.to_string(),
            adapter_type,
            setting_key.to_string(),
        );

        match rows.get_mut(&key) {
            Some(row) => {
                row.is_active = false;
                row.updated_at = Utc::now();
                Ok(true)
            },
            None => Ok(false),
        }
    }
}

// ============================================================================
// InterfaceStore
// ============================================================================

#[derive(Default)]
struct InterfaceState {
    interfaces: HashMap<String, InterfaceConfiguration>,
    destinations: Vec<DestinationBinding>,
}

/// In-memory interface wiring store
#[derive(Default)]
pub struct InMemoryInterfaceStore {
    state: Mutex<InterfaceState>,
}

impl InMemoryInterfaceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InterfaceStore for InMemoryInterfaceStore {
    async fn create_interface(&self, spec: NewInterface) -> BrokerResult<InterfaceConfiguration> {
        let mut state = self.state.lock().await;

        if state.interfaces.contains_key(&spec.interface_name) {
            return Err(BrokerError::DuplicateInterface(spec.interface_name));
        }

        let now = Utc::now();
        let interface = InterfaceConfiguration {
            id: Uuid::new_v4(),
            interface_name: spec.interface_name.clone(),
            source_adapter_name: spec.source_adapter_name,
            source_config: spec.source_config,
            is_enabled: true,
            description: spec.description,
            created_at: now,
            updated_at: now,
        };
        state
            .interfaces
            .insert(spec.interface_name, interface.clone());

        Ok(interface)
    }

    async fn get_interface(&self, name: &str) -> BrokerResult<Option<InterfaceConfiguration>> {
        let state = self.state.lock().await;
        Ok(state.interfaces.get(name).cloned())
    }

    async fn list_interfaces(&self) -> BrokerResult<Vec<InterfaceConfiguration>> {
        let state = self.state.lock().await;
        let mut interfaces: Vec<InterfaceConfiguration> =
            state.interfaces.values().cloned().collect();
        interfaces.sort_by(|a, b| a.interface_name.cmp(&b.interface_name));
        Ok(interfaces)
    }

    async fn set_interface_enabled(&self, name: &str, enabled: bool) -> BrokerResult<bool> {
        let mut state = self.state.lock().await;
        match state.interfaces.get_mut(name) {
            Some(interface) => {
                interface.is_enabled = enabled;
                interface.updated_at = Utc::now();
                Ok(true)
            },
            None => Ok(false),
        }
    }

    async fn add_destination(
        &self,
        interface_name: &str,
        destination_adapter_name: &str,
        destination_config: Option<Value>,
    ) -> BrokerResult<DestinationBinding> {
        let mut state = self.state.lock().await;

        let interface = state
            .interfaces
            .get(interface_name)
            .ok_or_else(|| BrokerError::InterfaceNotFound(interface_name.to_string()))?;
        check_destination_enable(interface, destination_adapter_name)?;

        let binding = DestinationBinding {
            id: Uuid::new_v4(),
            interface_name: interface_name.to_string(),
            destination_adapter_name: destination_adapter_name.to_string(),
            destination_config,
            is_enabled: true,
        };
        state.destinations.push(binding.clone());

        Ok(binding)
    }

    async fn set_destination_enabled(
        &self,
        interface_name: &str,
        destination_adapter_name: &str,
        enabled: bool,
    ) -> BrokerResult<bool> {
        let mut state = self.state.lock().await;

        if enabled {
            let interface = state
                .interfaces
                .get(interface_name)
                .ok_or_else(|| BrokerError::InterfaceNotFound(interface_name.to_string()))?;
            check_destination_enable(interface, destination_adapter_name)?;
        }

        for binding in state.destinations.iter_mut() {
            if binding.interface_name == interface_name
                && binding.destination_adapter_name == destination_adapter_name
            {
                binding.is_enabled = enabled;
                return Ok(true);
            }
        }

        Ok(false)
    }

    async fn destinations(&self, interface_name: &str) -> BrokerResult<Vec<DestinationBinding>> {
        let state = self.state.lock().await;
        Ok(state
            .destinations
            .iter()
            .filter(|d| d.interface_name == interface_name)
            .cloned()
            .collect())
    }

    async fn enabled_destinations(
        &self,
        interface_name: &str,
    ) -> BrokerResult<Vec<DestinationBinding>> {
        let state = self.state.lock().await;
        Ok(state
            .destinations
            .iter()
            .filter(|d| d.interface_name == interface_name && d.is_enabled)
            .cloned()
            .collect())
    }

    async fn delete_interface(&self, name: &str) -> BrokerResult<bool> {
        let mut state = self.state.lock().await;
        let existed = state.interfaces.remove(name).is_some();
        state.destinations.retain(|d| d.interface_name != name);
        Ok(existed)
    }
}

// ============================================================================
// InstanceStore
// ============================================================================

/// In-memory adapter instance registry
#[derive(Default)]
pub struct InMemoryInstanceStore {
    instances: Mutex<HashMap<Uuid, AdapterInstance>>,
}

impl InMemoryInstanceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InstanceStore for InMemoryInstanceStore {
    async fn upsert_instance(&self, instance: AdapterInstance) -> BrokerResult<AdapterInstance> {
        let mut instances = self.instances.lock().await;
        let mut stored = instance;
        stored.updated_at = Utc::now();
        instances.insert(stored.instance_guid, stored.clone());
        Ok(stored)
    }

    async fn get_instance(&self, guid: Uuid) -> BrokerResult<Option<AdapterInstance>> {
        let instances = self.instances.lock().await;
        Ok(instances.get(&guid).cloned())
    }

    async fn list_instances(
        &self,
        interface_name: Option<&str>,
    ) -> BrokerResult<Vec<AdapterInstance>> {
        let instances = self.instances.lock().await;
        let mut result: Vec<AdapterInstance> = instances
            .values()
            .filter(|i| interface_name.map_or(true, |name| i.interface_name == name))
            .cloned()
            .collect();
        result.sort_by_key(|i| (i.created_at, i.instance_guid));
        Ok(result)
    }

    async fn set_compute_unit(&self, guid: Uuid, compute_unit_id: &str) -> BrokerResult<bool> {
        let mut instances = self.instances.lock().await;
        match instances.get_mut(&guid) {
            Some(instance) => {
                instance.compute_unit_id = Some(compute_unit_id.to_string());
                instance.updated_at = Utc::now();
                Ok(true)
            },
            None => Ok(false),
        }
    }

    async fn set_enabled(&self, guid: Uuid, enabled: bool) -> BrokerResult<bool> {
        let mut instances = self.instances.lock().await;
        match instances.get_mut(&guid) {
            Some(instance) => {
                instance.is_enabled = enabled;
                instance.updated_at = Utc::now();
                Ok(true)
            },
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_message(interface: &str) -> NewMessage {
        NewMessage {
            interface_name: interface.to_string(),
            producing_adapter_name: "delimited-file".to_string(),
            producing_adapter_type: AdapterType::Source,
            payload: serde_json::json!({"columns": [], "values": []}),
            payload_checksum: None,
        }
    }

    #[tokio::test]
    async fn test_publish_creates_message_and_subscription_snapshot() {
        let store = InMemoryMessageStore::new();
        let receipt = store
            .publish(new_message("orders"), &["warehouse".to_string(), "billing".to_string()])
            .await
            .unwrap();

        assert_eq!(receipt.subscription_ids.len(), 2);

        let message = store.get_message(receipt.message_id).await.unwrap().unwrap();
        assert_eq!(message.status, MessageStatus::Processed);

        let subs = store.subscriptions_for(receipt.message_id).await.unwrap();
        assert_eq!(subs.len(), 2);
        assert!(subs.iter().all(|s| s.status == SubscriptionStatus::Pending));
    }

    #[tokio::test]
    async fn test_zero_subscriber_message_is_swept_immediately() {
        let store = InMemoryMessageStore::new();
        let receipt = store.publish(new_message("orders"), &[]).await.unwrap();

        let report = store.sweep().await.unwrap();
        assert_eq!(report.messages_deleted, 1);
        assert!(store.get_message(receipt.message_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_complete_subscription_is_conditional() {
        let store = InMemoryMessageStore::new();
        let receipt = store
            .publish(new_message("orders"), &["warehouse".to_string()])
            .await
            .unwrap();
        let sub_id = receipt.subscription_ids[0];

        let applied = store
            .complete_subscription(sub_id, DeliveryOutcome::Processed { details: None })
            .await
            .unwrap();
        assert!(applied);

        // A late duplicate must not overwrite the terminal state
        let applied_again = store
            .complete_subscription(
                sub_id,
                DeliveryOutcome::Error {
                    message: "late".to_string(),
                },
            )
            .await
            .unwrap();
        assert!(!applied_again);

        let subs = store.subscriptions_for(receipt.message_id).await.unwrap();
        assert_eq!(subs[0].status, SubscriptionStatus::Processed);
        assert!(subs[0].error_message.is_none());
    }

    #[tokio::test]
    async fn test_claim_is_scoped_to_subscriber_and_ordered() {
        let store = InMemoryMessageStore::new();
        let first = store
            .publish(new_message("orders"), &["warehouse".to_string()])
            .await
            .unwrap();
        let _other = store
            .publish(new_message("orders"), &["billing".to_string()])
            .await
            .unwrap();
        let second = store
            .publish(new_message("orders"), &["warehouse".to_string()])
            .await
            .unwrap();

        let claimed = store.claim_pending("warehouse", 10).await.unwrap();
        assert_eq!(claimed.len(), 2);
        assert_eq!(claimed[0].message_id, first.message_id);
        assert_eq!(claimed[1].message_id, second.message_id);
    }

    #[tokio::test]
    async fn test_retry_only_applies_to_error_rows() {
        let store = InMemoryMessageStore::new();
        let receipt = store
            .publish(new_message("orders"), &["warehouse".to_string()])
            .await
            .unwrap();
        let sub_id = receipt.subscription_ids[0];

        assert!(!store.retry_subscription(sub_id).await.unwrap());

        store
            .complete_subscription(
                sub_id,
                DeliveryOutcome::Error {
                    message: "disk full".to_string(),
                },
            )
            .await
            .unwrap();
        assert!(store.retry_subscription(sub_id).await.unwrap());

        let subs = store.subscriptions_for(receipt.message_id).await.unwrap();
        assert_eq!(subs[0].status, SubscriptionStatus::Pending);
        assert!(subs[0].error_message.is_none());
    }

    #[tokio::test]
    async fn test_config_store_layers_and_deactivation() {
        let store = InMemoryConfigStore::new();
        store
            .put("delimited-file", AdapterType::Source, "input_path", "/data/in.csv")
            .await
            .unwrap();
        store
            .put("delimited-file", AdapterType::Source, "delimiter", ";")
            .await
            .unwrap();

        let settings = store
            .settings("delimited-file", AdapterType::Source)
            .await
            .unwrap();
        assert_eq!(settings.len(), 2);
        assert_eq!(settings.get("delimiter"), Some(&";".to_string()));

        assert!(store
            .deactivate("delimited-file", AdapterType::Source, "delimiter")
            .await
            .unwrap());
        let settings = store
            .settings("delimited-file", AdapterType::Source)
            .await
            .unwrap();
        assert!(!settings.contains_key("delimiter"));

        // Same key for the destination type is a distinct row
        let empty = store
            .settings("delimited-file", AdapterType::Destination)
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_interface_store_destination_invariant() {
        let store = InMemoryInterfaceStore::new();
        store
            .create_interface(NewInterface {
                interface_name: "orders".to_string(),
                source_adapter_name: "delimited-file".to_string(),
                source_config: None,
                description: None,
            })
            .await
            .unwrap();

        store
            .add_destination("orders", "warehouse", None)
            .await
            .unwrap();
        assert_eq!(store.enabled_destinations("orders").await.unwrap().len(), 1);

        // Disabling the interface blocks re-enabling destinations
        store.set_interface_enabled("orders", false).await.unwrap();
        store
            .set_destination_enabled("orders", "warehouse", false)
            .await
            .unwrap();
        let err = store
            .set_destination_enabled("orders", "warehouse", true)
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::SourcelessDestination { .. }));
    }

    #[tokio::test]
    async fn test_instance_store_upsert_and_flags() {
        let store = InMemoryInstanceStore::new();
        let guid = Uuid::new_v4();
        let now = Utc::now();

        store
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

        assert!(store.set_compute_unit(guid, "rly-0123456789ab").await.unwrap());
        assert!(store.set_enabled(guid, false).await.unwrap());

        let instance = store.get_instance(guid).await.unwrap().unwrap();
        assert_eq!(instance.compute_unit_id.as_deref(), Some("rly-0123456789ab"));
        assert!(!instance.is_enabled);

        assert!(!store.set_enabled(Uuid::new_v4(), true).await.unwrap());
    }
}
