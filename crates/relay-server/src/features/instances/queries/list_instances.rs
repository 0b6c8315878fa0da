//! List adapter instances query

use mediator::Request;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use relay_broker::instance_store::InstanceStore;
use relay_broker::types::AdapterInstance;

/// Query to list adapter instances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListInstancesQuery {
    /// Filter by interface name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
}

/// Response for the list instances query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListInstancesResponse {
    pub instances: Vec<AdapterInstance>,
    pub total: usize,
}

/// Error type for the list instances query
#[derive(Debug, thiserror::Error)]
pub enum ListInstancesError {
    #[error("Broker error: {0}")]
    Broker(#[from] relay_broker::BrokerError),
}

impl Request<Result<ListInstancesResponse, ListInstancesError>> for ListInstancesQuery {}

pub async fn handle(
    instances: Arc<dyn InstanceStore>,
    query: ListInstancesQuery,
) -> Result<ListInstancesResponse, ListInstancesError> {
    let instances = instances.list_instances(query.interface.as_deref()).await?;

    Ok(ListInstancesResponse {
        total: instances.len(),
        instances,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use relay_broker::memory::InMemoryInstanceStore;
    use relay_common::AdapterType;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_list_with_interface_filter() {
        let store = Arc::new(InMemoryInstanceStore::new());
        let now = Utc::now();

        for interface in ["orders", "orders", "invoices"] {
            store
                .upsert_instance(AdapterInstance {
                    instance_guid: Uuid::new_v4(),
                    interface_name: interface.to_string(),
                    instance_name: format!("{interface}-out"),
                    adapter_name: "jsonl-file".to_string(),
                    adapter_type: AdapterType::Destination,
                    is_enabled: true,
                    compute_unit_id: None,
                    created_at: now,
                    updated_at: now,
                })
                .await
                .unwrap();
        }

        let all = handle(store.clone(), ListInstancesQuery { interface: None })
            .await
            .unwrap();
        assert_eq!(all.total, 3);

        let filtered = handle(
            store.clone(),
            ListInstancesQuery {
                interface: Some("orders".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(filtered.total, 2);
    }
}
