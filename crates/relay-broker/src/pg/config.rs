//! PostgreSQL adapter settings store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use std::str::FromStr;

use relay_common::AdapterType;

use crate::config_store::AdapterConfigStore;
use crate::error::BrokerResult;
use crate::types::AdapterConfiguration;

/// Settings store backed by the `adapter_configurations` table
#[derive(Clone)]
pub struct PgConfigStore {
    pool: PgPool,
}

impl PgConfigStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ConfigRow {
    adapter_name: String,
    adapter_type: String,
    setting_key: String,
    setting_value: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ConfigRow> for AdapterConfiguration {
    fn from(row: ConfigRow) -> Self {
        Self {
            adapter_name: row.adapter_name,
            adapter_type: AdapterType::from_str(&row.adapter_type).unwrap_or(AdapterType::Source),
            setting_key: row.setting_key,
            setting_value: row.setting_value,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl AdapterConfigStore for PgConfigStore {
    async fn settings(
        &self,
        adapter_name: &str,
        adapter_type: AdapterType,
    ) -> BrokerResult<HashMap<String, String>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT setting_key, setting_value
            FROM adapter_configurations
            WHERE adapter_name = $1 AND adapter_type = $2 AND is_active
            "#,
        )
        .bind(adapter_name)
        .bind(adapter_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    async fn rows(
        &self,
        adapter_name: &str,
        adapter_type: AdapterType,
    ) -> BrokerResult<Vec<AdapterConfiguration>> {
        let rows: Vec<ConfigRow> = sqlx::query_as(
            r#"
            SELECT adapter_name, adapter_type, setting_key, setting_value,
                   is_active, created_at, updated_at
            FROM adapter_configurations
            WHERE adapter_name = $1 AND adapter_type = $2
            ORDER BY setting_key
            "#,
        )
        .bind(adapter_name)
        .bind(adapter_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn put(
        &self,
        adapter_name: &str,
        adapter_type: AdapterType,
        setting_key: &str,
        setting_value: &str,
    ) -> BrokerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO adapter_configurations (
                adapter_name, adapter_type, setting_key, setting_value, is_active
            )
            VALUES ($1, $2, $3, $4, TRUE)
            ON CONFLICT (adapter_name, adapter_type, setting_key)
            DO UPDATE SET setting_value = EXCLUDED.setting_value,
                          is_active = TRUE,
                          updated_at = NOW()
            "#,
        )
        .bind(adapter_name)
        .bind(adapter_type.as_str())
        .bind(setting_key)
        .bind(setting_value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn deactivate(
        &self,
        adapter_name: &str,
        adapter_type: AdapterType,
        setting_key: &str,
    ) -> BrokerResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE adapter_configurations
            SET is_active = FALSE, updated_at = NOW()
            WHERE adapter_name = $1 AND adapter_type = $2 AND setting_key = $3
            "#,
        )
        .bind(adapter_name)
        .bind(adapter_type.as_str())
        .bind(setting_key)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
