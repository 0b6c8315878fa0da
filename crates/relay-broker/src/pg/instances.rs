//! PostgreSQL adapter instance registry

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

use relay_common::AdapterType;

use crate::error::{BrokerError, BrokerResult};
use crate::instance_store::InstanceStore;
use crate::types::AdapterInstance;

/// Instance registry backed by the `adapter_instances` table
#[derive(Clone)]
pub struct PgInstanceStore {
    pool: PgPool,
}

impl PgInstanceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct InstanceRow {
    instance_guid: Uuid,
    interface_name: String,
    instance_name: String,
    adapter_name: String,
    adapter_type: String,
    is_enabled: bool,
    compute_unit_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<InstanceRow> for AdapterInstance {
    fn from(row: InstanceRow) -> Self {
        Self {
            instance_guid: row.instance_guid,
            interface_name: row.interface_name,
            instance_name: row.instance_name,
            adapter_name: row.adapter_name,
            adapter_type: AdapterType::from_str(&row.adapter_type).unwrap_or(AdapterType::Source),
            is_enabled: row.is_enabled,
            compute_unit_id: row.compute_unit_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT instance_guid, interface_name, instance_name, adapter_name,
           adapter_type, is_enabled, compute_unit_id, created_at, updated_at
    FROM adapter_instances
"#;

#[async_trait]
impl InstanceStore for PgInstanceStore {
    async fn upsert_instance(&self, instance: AdapterInstance) -> BrokerResult<AdapterInstance> {
        sqlx::query(
            r#"
            INSERT INTO adapter_instances (
                instance_guid, interface_name, instance_name, adapter_name,
                adapter_type, is_enabled, compute_unit_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (instance_guid)
            DO UPDATE SET interface_name = EXCLUDED.interface_name,
                          instance_name = EXCLUDED.instance_name,
                          adapter_name = EXCLUDED.adapter_name,
                          adapter_type = EXCLUDED.adapter_type,
                          is_enabled = EXCLUDED.is_enabled,
                          compute_unit_id = EXCLUDED.compute_unit_id,
                          updated_at = NOW()
            "#,
        )
        .bind(instance.instance_guid)
        .bind(&instance.interface_name)
        .bind(&instance.instance_name)
        .bind(&instance.adapter_name)
        .bind(instance.adapter_type.as_str())
        .bind(instance.is_enabled)
        .bind(&instance.compute_unit_id)
        .execute(&self.pool)
        .await?;

        self.get_instance(instance.instance_guid)
            .await?
            .ok_or(BrokerError::InstanceNotFound(instance.instance_guid))
    }

    async fn get_instance(&self, guid: Uuid) -> BrokerResult<Option<AdapterInstance>> {
        let sql = format!("{SELECT_COLUMNS} WHERE instance_guid = $1");
        let row: Option<InstanceRow> = sqlx::query_as(&sql)
            .bind(guid)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn list_instances(
        &self,
        interface_name: Option<&str>,
    ) -> BrokerResult<Vec<AdapterInstance>> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE ($1::text IS NULL OR interface_name = $1) ORDER BY created_at"
        );
        let rows: Vec<InstanceRow> = sqlx::query_as(&sql)
            .bind(interface_name)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn set_compute_unit(&self, guid: Uuid, compute_unit_id: &str) -> BrokerResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE adapter_instances
            SET compute_unit_id = $2, updated_at = NOW()
            WHERE instance_guid = $1
            "#,
        )
        .bind(guid)
        .bind(compute_unit_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_enabled(&self, guid: Uuid, enabled: bool) -> BrokerResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE adapter_instances
            SET is_enabled = $2, updated_at = NOW()
            WHERE instance_guid = $1
            "#,
        )
        .bind(guid)
        .bind(enabled)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
