//! Get one message with its subscription rows

use mediator::Request;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use relay_broker::message_store::MessageStore;
use relay_broker::types::{MessageBoxMessage, MessageSubscription};

/// Query for one MessageBox entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetMessageQuery {
    pub message_id: Uuid,
}

/// Response for the get message query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetMessageResponse {
    pub message: MessageBoxMessage,
    pub subscriptions: Vec<MessageSubscription>,
}

/// Error type for the get message query
#[derive(Debug, thiserror::Error)]
pub enum GetMessageError {
    #[error("Message not found: {0}")]
    NotFound(Uuid),

    #[error("Broker error: {0}")]
    Broker(#[from] relay_broker::BrokerError),
}

impl Request<Result<GetMessageResponse, GetMessageError>> for GetMessageQuery {}

pub async fn handle(
    store: Arc<dyn MessageStore>,
    query: GetMessageQuery,
) -> Result<GetMessageResponse, GetMessageError> {
    let message = store
        .get_message(query.message_id)
        .await?
        .ok_or(GetMessageError::NotFound(query.message_id))?;
    let subscriptions = store.subscriptions_for(query.message_id).await?;

    Ok(GetMessageResponse {
        message,
        subscriptions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_broker::memory::InMemoryMessageStore;
    use relay_broker::types::NewMessage;
    use relay_common::AdapterType;

    #[tokio::test]
    async fn test_get_message_with_subscriptions() {
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
                &["warehouse".to_string(), "billing".to_string()],
            )
            .await
            .unwrap();

        let response = handle(
            store.clone(),
            GetMessageQuery {
                message_id: receipt.message_id,
            },
        )
        .await
        .unwrap();

        assert_eq!(response.message.id, receipt.message_id);
        assert_eq!(response.subscriptions.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_message_is_not_found() {
        let store = Arc::new(InMemoryMessageStore::new());
        let result = handle(
            store,
            GetMessageQuery {
                message_id: Uuid::new_v4(),
            },
        )
        .await;

        assert!(matches!(result, Err(GetMessageError::NotFound(_))));
    }
}
