//! PostgreSQL MessageBox store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::str::FromStr;
use tracing::error;
use uuid::Uuid;

use relay_common::AdapterType;

use crate::error::BrokerResult;
use crate::message_store::MessageStore;
use crate::types::{
    DeliveryOutcome, MessageBoxMessage, MessageStatus, MessageSubscription, NewMessage,
    PendingDelivery, PublishReceipt, StatusCounts, SubscriptionStatus, SweepReport,
};

/// MessageBox store backed by the `messagebox_messages` and
/// `message_subscriptions` tables
#[derive(Clone)]
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    interface_name: String,
    producing_adapter_name: String,
    producing_adapter_type: String,
    payload: serde_json::Value,
    payload_checksum: Option<String>,
    status: String,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
}

impl From<MessageRow> for MessageBoxMessage {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            interface_name: row.interface_name,
            producing_adapter_name: row.producing_adapter_name,
            // The column carries a CHECK constraint; fall back defensively
            producing_adapter_type: AdapterType::from_str(&row.producing_adapter_type)
                .unwrap_or(AdapterType::Source),
            payload: row.payload,
            payload_checksum: row.payload_checksum,
            status: MessageStatus::from(row.status),
            error_message: row.error_message,
            created_at: row.created_at,
            processed_at: row.processed_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    message_id: Uuid,
    interface_name: String,
    subscriber_adapter_name: String,
    status: String,
    error_message: Option<String>,
    processing_details: Option<String>,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
}

impl From<SubscriptionRow> for MessageSubscription {
    fn from(row: SubscriptionRow) -> Self {
        Self {
            id: row.id,
            message_id: row.message_id,
            interface_name: row.interface_name,
            subscriber_adapter_name: row.subscriber_adapter_name,
            status: SubscriptionStatus::from(row.status),
            error_message: row.error_message,
            processing_details: row.processing_details,
            created_at: row.created_at,
            processed_at: row.processed_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DeliveryRow {
    subscription_id: Uuid,
    message_id: Uuid,
    interface_name: String,
    payload: serde_json::Value,
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn publish(
        &self,
        message: NewMessage,
        subscribers: &[String],
    ) -> BrokerResult<PublishReceipt> {
        let message_id = Uuid::new_v4();

        // The message and its subscription snapshot commit together:
        // a crash in between leaves nothing behind.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO messagebox_messages (
                id, interface_name, producing_adapter_name, producing_adapter_type,
                payload, payload_checksum, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'pending')
            "#,
        )
        .bind(message_id)
        .bind(&message.interface_name)
        .bind(&message.producing_adapter_name)
        .bind(message.producing_adapter_type.as_str())
        .bind(&message.payload)
        .bind(&message.payload_checksum)
        .execute(&mut *tx)
        .await?;

        let mut subscription_ids = Vec::with_capacity(subscribers.len());
        for subscriber in subscribers {
            let subscription_id = Uuid::new_v4();
            sqlx::query(
                r#"
                INSERT INTO message_subscriptions (
                    id, message_id, interface_name, subscriber_adapter_name, status
                )
                VALUES ($1, $2, $3, $4, 'pending')
                "#,
            )
            .bind(subscription_id)
            .bind(message_id)
            .bind(&message.interface_name)
            .bind(subscriber)
            .execute(&mut *tx)
            .await?;
            subscription_ids.push(subscription_id);
        }

        tx.commit().await?;

        // Production is complete once the transaction is durable; mark it.
        // Consumers only see messages in processed state, so a failure
        // here leaves the message undistributed, not half-distributed.
        let mark = sqlx::query(
            "UPDATE messagebox_messages SET status = 'processed', processed_at = NOW() WHERE id = $1",
        )
        .bind(message_id)
        .execute(&self.pool)
        .await;

        if let Err(e) = mark {
            error!(message_id = %message_id, error = %e, "Failed to mark message produced");
            let _ = sqlx::query(
                "UPDATE messagebox_messages SET status = 'error', error_message = $2 WHERE id = $1",
            )
            .bind(message_id)
            .bind(e.to_string())
            .execute(&self.pool)
            .await;
            return Err(e.into());
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
        let rows: Vec<DeliveryRow> = sqlx::query_as(
            r#"
            SELECT s.id AS subscription_id, s.message_id, s.interface_name, m.payload
            FROM message_subscriptions s
            JOIN messagebox_messages m ON m.id = s.message_id
            WHERE s.subscriber_adapter_name = $1
              AND s.status = 'pending'
              AND m.status = 'processed'
            ORDER BY s.created_at
            LIMIT $2
            "#,
        )
        .bind(subscriber_adapter_name)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| PendingDelivery {
                subscription_id: r.subscription_id,
                message_id: r.message_id,
                interface_name: r.interface_name,
                payload: r.payload,
            })
            .collect())
    }

    async fn complete_subscription(
        &self,
        subscription_id: Uuid,
        outcome: DeliveryOutcome,
    ) -> BrokerResult<bool> {
        // Guarded by the current status: a duplicate or late retry cannot
        // overwrite an already-terminal row.
        let result = match outcome {
            DeliveryOutcome::Processed { details } => {
                sqlx::query(
                    r#"
                    UPDATE message_subscriptions
                    SET status = 'processed', processing_details = $2, processed_at = NOW()
                    WHERE id = $1 AND status = 'pending'
                    "#,
                )
                .bind(subscription_id)
                .bind(details)
                .execute(&self.pool)
                .await?
            },
            DeliveryOutcome::Error { message } => {
                sqlx::query(
                    r#"
                    UPDATE message_subscriptions
                    SET status = 'error', error_message = $2, processed_at = NOW()
                    WHERE id = $1 AND status = 'pending'
                    "#,
                )
                .bind(subscription_id)
                .bind(message)
                .execute(&self.pool)
                .await?
            },
        };

        Ok(result.rows_affected() > 0)
    }

    async fn retry_subscription(&self, subscription_id: Uuid) -> BrokerResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE message_subscriptions
            SET status = 'pending', error_message = NULL, processed_at = NULL
            WHERE id = $1 AND status = 'error'
            "#,
        )
        .bind(subscription_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn sweep(&self) -> BrokerResult<SweepReport> {
        // One statement evaluates the predicate and deletes: the
        // `deletable` set is computed from a single snapshot, and
        // subscription rows go with their message via ON DELETE CASCADE.
        let (messages_deleted, subscriptions_deleted): (i64, i64) = sqlx::query_as(
            r#"
            WITH deletable AS (
                SELECT m.id,
                       (SELECT COUNT(*) FROM message_subscriptions s WHERE s.message_id = m.id) AS sub_count
                FROM messagebox_messages m
                WHERE m.status = 'processed'
                  AND NOT EXISTS (
                      SELECT 1 FROM message_subscriptions s
                      WHERE s.message_id = m.id AND s.status <> 'processed'
                  )
            ),
            deleted AS (
                DELETE FROM messagebox_messages m
                USING deletable d
                WHERE m.id = d.id
                RETURNING d.sub_count
            )
            SELECT COUNT(*)::bigint, COALESCE(SUM(sub_count), 0)::bigint FROM deleted
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let (messages_retained_error,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(DISTINCT s.message_id)::bigint
            FROM message_subscriptions s
            WHERE s.status = 'error'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(SweepReport {
            messages_deleted: messages_deleted.max(0) as u64,
            subscriptions_deleted: subscriptions_deleted.max(0) as u64,
            messages_retained_error: messages_retained_error.max(0) as u64,
        })
    }

    async fn get_message(&self, message_id: Uuid) -> BrokerResult<Option<MessageBoxMessage>> {
        let row: Option<MessageRow> = sqlx::query_as(
            r#"
            SELECT id, interface_name, producing_adapter_name, producing_adapter_type,
                   payload, payload_checksum, status, error_message, created_at, processed_at
            FROM messagebox_messages
            WHERE id = $1
            "#,
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn subscriptions_for(
        &self,
        message_id: Uuid,
    ) -> BrokerResult<Vec<MessageSubscription>> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT id, message_id, interface_name, subscriber_adapter_name,
                   status, error_message, processing_details, created_at, processed_at
            FROM message_subscriptions
            WHERE message_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(message_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_pending_messages(
        &self,
        interface_name: &str,
        subscriber_adapter_name: Option<&str>,
        limit: i64,
    ) -> BrokerResult<Vec<MessageBoxMessage>> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT m.id, m.interface_name, m.producing_adapter_name, m.producing_adapter_type,
                   m.payload, m.payload_checksum, m.status, m.error_message, m.created_at, m.processed_at
            FROM messagebox_messages m
            WHERE m.interface_name = $1
              AND EXISTS (
                  SELECT 1 FROM message_subscriptions s
                  WHERE s.message_id = m.id
                    AND s.status = 'pending'
                    AND ($2::text IS NULL OR s.subscriber_adapter_name = $2)
              )
            ORDER BY m.created_at
            LIMIT $3
            "#,
        )
        .bind(interface_name)
        .bind(subscriber_adapter_name)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn counts_by_status(&self, interface_name: &str) -> BrokerResult<StatusCounts> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT status, COUNT(*)::bigint
            FROM message_subscriptions
            WHERE interface_name = $1
            GROUP BY status
            "#,
        )
        .bind(interface_name)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            match status.as_str() {
                "pending" => counts.pending = count,
                "processed" => counts.processed = count,
                "error" => counts.error = count,
                _ => {},
            }
        }

        Ok(counts)
    }
}
