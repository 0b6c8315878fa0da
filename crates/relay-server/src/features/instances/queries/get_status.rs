//! Get orchestrator status for one adapter instance

use mediator::Request;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use relay_broker::instance_store::InstanceStore;
use relay_broker::types::AdapterInstance;

use crate::orchestrator::{compute_unit_id, AdapterInstanceOrchestrator, OrchestratorError};

/// Query for one instance's compute status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetInstanceStatusQuery {
    pub instance_guid: Uuid,
}

/// Response for the status query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetInstanceStatusResponse {
    pub instance: AdapterInstance,
    pub compute_unit_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Error type for the status query
#[derive(Debug, thiserror::Error)]
pub enum GetInstanceStatusError {
    #[error("Adapter instance not found: {0}")]
    NotFound(Uuid),

    #[error("Broker error: {0}")]
    Broker(#[from] relay_broker::BrokerError),

    #[error("Orchestrator error: {0}")]
    Orchestrator(#[from] OrchestratorError),
}

impl Request<Result<GetInstanceStatusResponse, GetInstanceStatusError>>
    for GetInstanceStatusQuery
{
}

pub async fn handle(
    instances: Arc<dyn InstanceStore>,
    orchestrator: Arc<AdapterInstanceOrchestrator>,
    query: GetInstanceStatusQuery,
) -> Result<GetInstanceStatusResponse, GetInstanceStatusError> {
    let instance = instances
        .get_instance(query.instance_guid)
        .await?
        .ok_or(GetInstanceStatusError::NotFound(query.instance_guid))?;

    let status = orchestrator.status(query.instance_guid).await?;

    Ok(GetInstanceStatusResponse {
        compute_unit_id: compute_unit_id(query.instance_guid),
        status: status.label().to_string(),
        detail: status.detail().map(str::to_string),
        instance,
    })
}
