//! List pending MessageBox entries query
//!
//! The inspection view of in-flight traffic: messages of one interface
//! that still have at least one pending subscription, optionally scoped
//! to a single subscriber adapter.

use mediator::Request;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use relay_broker::message_store::MessageStore;
use relay_broker::types::{MessageBoxMessage, MessageSubscription};

/// Default page size when the caller does not pass a limit
const DEFAULT_LIMIT: i64 = 100;

/// Hard cap on one page
const MAX_LIMIT: i64 = 1000;

/// Query for pending MessageBox entries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPendingQuery {
    pub interface: String,
    /// Restrict to one subscriber adapter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscriber: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

/// One message with its delivery-tracking rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingMessageView {
    pub message: MessageBoxMessage,
    pub subscriptions: Vec<MessageSubscription>,
}

/// Response for the list pending query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPendingResponse {
    pub messages: Vec<PendingMessageView>,
    pub total: usize,
}

/// Error type for the list pending query
#[derive(Debug, thiserror::Error)]
pub enum ListPendingError {
    #[error("Broker error: {0}")]
    Broker(#[from] relay_broker::BrokerError),
}

impl Request<Result<ListPendingResponse, ListPendingError>> for ListPendingQuery {}

pub async fn handle(
    store: Arc<dyn MessageStore>,
    query: ListPendingQuery,
) -> Result<ListPendingResponse, ListPendingError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let messages = store
        .list_pending_messages(&query.interface, query.subscriber.as_deref(), limit)
        .await?;

    let mut views = Vec::with_capacity(messages.len());
    for message in messages {
        let subscriptions = store.subscriptions_for(message.id).await?;
        views.push(PendingMessageView {
            message,
            subscriptions,
        });
    }

    Ok(ListPendingResponse {
        total: views.len(),
        messages: views,
    })
}
