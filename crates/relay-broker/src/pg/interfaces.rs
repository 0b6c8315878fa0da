//! PostgreSQL interface wiring store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{BrokerError, BrokerResult};
use crate::interface_store::{check_destination_enable, InterfaceStore};
use crate::types::{DestinationBinding, InterfaceConfiguration, NewInterface};

/// Interface store backed by the `interface_configurations` and
/// `interface_destinations` tables
#[derive(Clone)]
pub struct PgInterfaceStore {
    pool: PgPool,
}

impl PgInterfaceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_interface(
        &self,
        name: &str,
    ) -> BrokerResult<Option<InterfaceConfiguration>> {
        let row: Option<InterfaceRow> = sqlx::query_as(
            r#"
            SELECT id, interface_name, source_adapter_name, source_config,
                   is_enabled, description, created_at, updated_at
            FROM interface_configurations
            WHERE interface_name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}

#[derive(sqlx::FromRow)]
struct InterfaceRow {
    id: Uuid,
    interface_name: String,
    source_adapter_name: String,
    source_config: Option<Value>,
    is_enabled: bool,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<InterfaceRow> for InterfaceConfiguration {
    fn from(row: InterfaceRow) -> Self {
        Self {
            id: row.id,
            interface_name: row.interface_name,
            source_adapter_name: row.source_adapter_name,
            source_config: row.source_config,
            is_enabled: row.is_enabled,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DestinationRow {
    id: Uuid,
    interface_name: String,
    destination_adapter_name: String,
    destination_config: Option<Value>,
    is_enabled: bool,
}

impl From<DestinationRow> for DestinationBinding {
    fn from(row: DestinationRow) -> Self {
        Self {
            id: row.id,
            interface_name: row.interface_name,
            destination_adapter_name: row.destination_adapter_name,
            destination_config: row.destination_config,
            is_enabled: row.is_enabled,
        }
    }
}

#[async_trait]
impl InterfaceStore for PgInterfaceStore {
    async fn create_interface(&self, spec: NewInterface) -> BrokerResult<InterfaceConfiguration> {
        let id = Uuid::new_v4();

        let inserted = sqlx::query(
            r#"
            INSERT INTO interface_configurations (
                id, interface_name, source_adapter_name, source_config, is_enabled, description
            )
            VALUES ($1, $2, $3, $4, TRUE, $5)
            "#,
        )
        .bind(id)
        .bind(&spec.interface_name)
        .bind(&spec.source_adapter_name)
        .bind(&spec.source_config)
        .bind(&spec.description)
        .execute(&self.pool)
        .await;

        if let Err(sqlx::Error::Database(ref db_err)) = inserted {
            if db_err.is_unique_violation() {
                return Err(BrokerError::DuplicateInterface(spec.interface_name));
            }
        }
        inserted?;

        self.fetch_interface(&spec.interface_name)
            .await?
            .ok_or_else(|| BrokerError::InterfaceNotFound(spec.interface_name))
    }

    async fn get_interface(&self, name: &str) -> BrokerResult<Option<InterfaceConfiguration>> {
        self.fetch_interface(name).await
    }

    async fn list_interfaces(&self) -> BrokerResult<Vec<InterfaceConfiguration>> {
        let rows: Vec<InterfaceRow> = sqlx::query_as(
            r#"
            SELECT id, interface_name, source_adapter_name, source_config,
                   is_enabled, description, created_at, updated_at
            FROM interface_configurations
            ORDER BY interface_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn set_interface_enabled(&self, name: &str, enabled: bool) -> BrokerResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE interface_configurations
            SET is_enabled = $2, updated_at = NOW()
            WHERE interface_name = $1
            "#,
        )
        .bind(name)
        .bind(enabled)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_destination(
        &self,
        interface_name: &str,
        destination_adapter_name: &str,
        destination_config: Option<Value>,
    ) -> BrokerResult<DestinationBinding> {
        let interface = self
            .fetch_interface(interface_name)
            .await?
            .ok_or_else(|| BrokerError::InterfaceNotFound(interface_name.to_string()))?;
        check_destination_enable(&interface, destination_adapter_name)?;

        let row: DestinationRow = sqlx::query_as(
            r#"
            INSERT INTO interface_destinations (
                id, interface_name, destination_adapter_name, destination_config, is_enabled
            )
            VALUES ($1, $2, $3, $4, TRUE)
            ON CONFLICT (interface_name, destination_adapter_name)
            DO UPDATE SET destination_config = EXCLUDED.destination_config,
                          is_enabled = TRUE
            RETURNING id, interface_name, destination_adapter_name, destination_config, is_enabled
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(interface_name)
        .bind(destination_adapter_name)
        .bind(&destination_config)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn set_destination_enabled(
        &self,
        interface_name: &str,
        destination_adapter_name: &str,
        enabled: bool,
    ) -> BrokerResult<bool> {
        if enabled {
            let interface = self
                .fetch_interface(interface_name)
                .await?
                .ok_or_else(|| BrokerError::InterfaceNotFound(interface_name.to_string()))?;
            check_destination_enable(&interface, destination_adapter_name)?;
        }

        let result = sqlx::query(
            r#"
            UPDATE interface_destinations
            SET is_enabled = $3
            WHERE interface_name = $1 AND destination_adapter_name = $2
            "#,
        )
        .bind(interface_name)
        .bind(destination_adapter_name)
        .bind(enabled)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn destinations(&self, interface_name: &str) -> BrokerResult<Vec<DestinationBinding>> {
        let rows: Vec<DestinationRow> = sqlx::query_as(
            r#"
            SELECT id, interface_name, destination_adapter_name, destination_config, is_enabled
            FROM interface_destinations
            WHERE interface_name = $1
            ORDER BY destination_adapter_name
            "#,
        )
        .bind(interface_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn enabled_destinations(
        &self,
        interface_name: &str,
    ) -> BrokerResult<Vec<DestinationBinding>> {
        let rows: Vec<DestinationRow> = sqlx::query_as(
            r#"
            SELECT id, interface_name, destination_adapter_name, destination_config, is_enabled
            FROM interface_destinations
            WHERE interface_name = $1 AND is_enabled
            ORDER BY destination_adapter_name
            "#,
        )
        .bind(interface_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_interface(&self, name: &str) -> BrokerResult<bool> {
        // Destination bindings cascade with the interface row
        let result = sqlx::query("DELETE FROM interface_configurations WHERE interface_name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
