//! Operator-triggered subscription retry
//!
//! Flips one errored subscription back to pending so its destination
//! claims it again. The only write the inspection API exposes: failed
//! deliveries are retained until an operator re-drives them.

use mediator::Request;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use relay_broker::message_store::MessageStore;

/// Command to retry one errored subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySubscriptionCommand {
    pub subscription_id: Uuid,
}

/// Response from a retry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySubscriptionResponse {
    pub subscription_id: Uuid,
    pub retried: bool,
}

/// Errors from the retry command
#[derive(Debug, thiserror::Error)]
pub enum RetrySubscriptionError {
    /// The subscription is missing or not in error state
    #[error("Subscription {0} is not retryable")]
    NotRetryable(Uuid),

    #[error("Broker error: {0}")]
    Broker(#[from] relay_broker::BrokerError),
}

impl Request<Result<RetrySubscriptionResponse, RetrySubscriptionError>>
    for RetrySubscriptionCommand
{
}

#[tracing::instrument(skip(store))]
pub async fn handle(
    store: Arc<dyn MessageStore>,
    command: RetrySubscriptionCommand,
) -> Result<RetrySubscriptionResponse, RetrySubscriptionError> {
    let retried = store.retry_subscription(command.subscription_id).await?;
    if !retried {
        return Err(RetrySubscriptionError::NotRetryable(command.subscription_id));
    }

    tracing::info!(subscription_id = %command.subscription_id, "Subscription queued for retry");

    Ok(RetrySubscriptionResponse {
        subscription_id: command.subscription_id,
        retried,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_broker::memory::InMemoryMessageStore;
    use relay_broker::types::{DeliveryOutcome, NewMessage};
    use relay_common::AdapterType;

    #[tokio::test]
    async fn test_retry_errored_subscription() {
        let store = Arc::new(InMemoryMessageStore::new());
        let receipt = store
            .publish(
                NewMessage {
                    interface_name: "orders".to_string(),
                    producing_adapter_name: "delimited-file".to_string(),
                    producing_adapter_type: AdapterType::Source,
                    payload: serde_json::json!({}),
                    payload_checksum: None,
                },
                &["warehouse".to_string()],
            )
            .await
            .unwrap();
        let subscription_id = receipt.subscription_ids[0];

        // Pending rows are not retryable
        let result = handle(store.clone(), RetrySubscriptionCommand { subscription_id }).await;
        assert!(matches!(result, Err(RetrySubscriptionError::NotRetryable(_))));

        store
            .complete_subscription(
                subscription_id,
                DeliveryOutcome::Error {
                    message: "boom".to_string(),
                },
            )
            .await
            .unwrap();

        let response = handle(store.clone(), RetrySubscriptionCommand { subscription_id })
            .await
            .unwrap();
        assert!(response.retried);
    }
}
