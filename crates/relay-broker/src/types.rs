//! Core types for the staging and configuration stores

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use relay_common::AdapterType;

/// Production status of a MessageBox entry.
///
/// Tracks whether ingestion into the box succeeded; distribution
/// completeness is tracked purely through the subscription rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Processed,
    Error,
}

impl MessageStatus {
    pub fn as_str(&self) -> &str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Processed => "processed",
            MessageStatus::Error => "error",
        }
    }
}

impl From<String> for MessageStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "processed" => MessageStatus::Processed,
            "error" => MessageStatus::Error,
            _ => MessageStatus::Pending,
        }
    }
}

/// Delivery status of one (message, destination) subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Pending,
    Processed,
    Error,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Processed => "processed",
            SubscriptionStatus::Error => "error",
        }
    }

    /// Terminal statuses no longer hold a message in the box
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SubscriptionStatus::Pending)
    }
}

impl From<String> for SubscriptionStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "processed" => SubscriptionStatus::Processed,
            "error" => SubscriptionStatus::Error,
            _ => SubscriptionStatus::Pending,
        }
    }
}

/// One logical record in flight (maps to `messagebox_messages`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBoxMessage {
    pub id: Uuid,
    pub interface_name: String,
    pub producing_adapter_name: String,
    pub producing_adapter_type: AdapterType,
    pub payload: serde_json::Value,
    pub payload_checksum: Option<String>,
    pub status: MessageStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// One delivery-tracking row (maps to `message_subscriptions`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSubscription {
    pub id: Uuid,
    pub message_id: Uuid,
    pub interface_name: String,
    pub subscriber_adapter_name: String,
    pub status: SubscriptionStatus,
    pub error_message: Option<String>,
    pub processing_details: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// A record handed to the MessageBox for publication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub interface_name: String,
    pub producing_adapter_name: String,
    pub producing_adapter_type: AdapterType,
    pub payload: serde_json::Value,
    pub payload_checksum: Option<String>,
}

/// Result of a successful publish
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishReceipt {
    pub message_id: Uuid,
    pub subscription_ids: Vec<Uuid>,
}

/// A pending subscription together with its message payload, as claimed
/// by a destination adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingDelivery {
    pub subscription_id: Uuid,
    pub message_id: Uuid,
    pub interface_name: String,
    pub payload: serde_json::Value,
}

/// Terminal outcome a destination reports for a claimed delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DeliveryOutcome {
    Processed { details: Option<String> },
    Error { message: String },
}

/// Result of one garbage-collection sweep
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SweepReport {
    pub messages_deleted: u64,
    pub subscriptions_deleted: u64,
    /// Messages held back because at least one subscription is in error
    pub messages_retained_error: u64,
}

/// Subscription counts per status for one interface
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub processed: i64,
    pub error: i64,
}

/// One key/value setting row for an adapter kind (maps to
/// `adapter_configurations`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfiguration {
    pub adapter_name: String,
    pub adapter_type: AdapterType,
    pub setting_key: String,
    pub setting_value: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One source→destinations wiring (maps to `interface_configurations`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceConfiguration {
    pub id: Uuid,
    pub interface_name: String,
    pub source_adapter_name: String,
    pub source_config: Option<serde_json::Value>,
    pub is_enabled: bool,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for creating an interface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInterface {
    pub interface_name: String,
    pub source_adapter_name: String,
    pub source_config: Option<serde_json::Value>,
    pub description: Option<String>,
}

/// One destination binding of an interface (maps to
/// `interface_destinations`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationBinding {
    pub id: Uuid,
    pub interface_name: String,
    pub destination_adapter_name: String,
    pub destination_config: Option<serde_json::Value>,
    pub is_enabled: bool,
}

/// One configured adapter instance (maps to `adapter_instances`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterInstance {
    pub instance_guid: Uuid,
    pub interface_name: String,
    pub instance_name: String,
    pub adapter_name: String,
    pub adapter_type: AdapterType,
    pub is_enabled: bool,
    pub compute_unit_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            SubscriptionStatus::Pending,
            SubscriptionStatus::Processed,
            SubscriptionStatus::Error,
        ] {
            assert_eq!(SubscriptionStatus::from(status.as_str().to_string()), status);
        }
        assert_eq!(MessageStatus::from("processed".to_string()), MessageStatus::Processed);
        assert_eq!(MessageStatus::from("garbage".to_string()), MessageStatus::Pending);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!SubscriptionStatus::Pending.is_terminal());
        assert!(SubscriptionStatus::Processed.is_terminal());
        assert!(SubscriptionStatus::Error.is_terminal());
    }
}
