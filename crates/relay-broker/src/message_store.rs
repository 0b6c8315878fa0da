//! MessageBox store contract
//!
//! The storage engine behind the MessageBox is an implementation detail;
//! everything above it programs against this trait. Two implementations
//! exist with identical semantics: [`crate::pg::PgMessageStore`] and
//! [`crate::memory::InMemoryMessageStore`].

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::BrokerResult;
use crate::types::{
    DeliveryOutcome, MessageBoxMessage, MessageSubscription, NewMessage, PendingDelivery,
    PublishReceipt, StatusCounts, SweepReport,
};

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Publish one message with its subscription snapshot.
    ///
    /// The message row and one subscription row per subscriber are
    /// committed atomically; a crash between the two must never leave
    /// subscribers unable to claim a message that logically exists. Once
    /// persisted, the message is marked `processed` (production
    /// complete). Zero subscribers is allowed: the message is then
    /// immediately eligible for garbage collection.
    async fn publish(
        &self,
        message: NewMessage,
        subscribers: &[String],
    ) -> BrokerResult<PublishReceipt>;

    /// Fetch up to `limit` pending deliveries for one subscriber, oldest
    /// first. Only messages whose production completed are handed out.
    async fn claim_pending(
        &self,
        subscriber_adapter_name: &str,
        limit: i64,
    ) -> BrokerResult<Vec<PendingDelivery>>;

    /// Record the terminal outcome of one delivery.
    ///
    /// Conditional on the row still being `pending`: a duplicate or late
    /// acknowledgement is absorbed without overwriting the earlier
    /// terminal state. Returns whether the write was applied.
    async fn complete_subscription(
        &self,
        subscription_id: Uuid,
        outcome: DeliveryOutcome,
    ) -> BrokerResult<bool>;

    /// Operator-triggered retry: flip an `error` subscription back to
    /// `pending` so its destination picks it up again. Returns whether
    /// the row was in error state.
    async fn retry_subscription(&self, subscription_id: Uuid) -> BrokerResult<bool>;

    /// Garbage-collect messages whose every subscription is `processed`.
    ///
    /// The deletion predicate is evaluated from a single consistent read
    /// and message + subscription rows are removed atomically, so a
    /// message is never purged while a destination still needs it.
    /// Messages with any `error` subscription are retained for operator
    /// inspection.
    async fn sweep(&self) -> BrokerResult<SweepReport>;

    async fn get_message(&self, message_id: Uuid) -> BrokerResult<Option<MessageBoxMessage>>;

    async fn subscriptions_for(
        &self,
        message_id: Uuid,
    ) -> BrokerResult<Vec<MessageSubscription>>;

    /// Messages of one interface that still have at least one pending
    /// subscription, optionally filtered to one subscriber
    async fn list_pending_messages(
        &self,
        interface_name: &str,
        subscriber_adapter_name: Option<&str>,
        limit: i64,
    ) -> BrokerResult<Vec<MessageBoxMessage>>;

    /// Subscription counts per status for one interface
    async fn counts_by_status(&self, interface_name: &str) -> BrokerResult<StatusCounts>;
}
