//! Broker-specific error types

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for broker operations
pub type BrokerResult<T> = std::result::Result<T, BrokerError>;

/// Errors raised by the staging and configuration stores
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Message not found: {0}")]
    MessageNotFound(Uuid),

    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(Uuid),

    #[error("Interface not found: {0}")]
    InterfaceNotFound(String),

    #[error("Interface '{0}' already exists")]
    DuplicateInterface(String),

    #[error("Interface '{0}' is disabled")]
    InterfaceDisabled(String),

    #[error("Interface '{interface}' cannot enable destination '{destination}': no enabled source adapter")]
    SourcelessDestination {
        interface: String,
        destination: String,
    },

    #[error("Adapter instance not found: {0}")]
    InstanceNotFound(Uuid),

    #[error("Adapter configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
