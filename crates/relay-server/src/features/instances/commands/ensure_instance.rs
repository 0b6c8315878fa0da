//! Ensure an instance's compute unit exists

use mediator::Request;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::orchestrator::{AdapterInstanceOrchestrator, OrchestratorError};

/// Command to create-or-get an instance's compute unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsureInstanceCommand {
    pub instance_guid: Uuid,
}

/// Response from the ensure command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsureInstanceResponse {
    pub instance_guid: Uuid,
    pub compute_unit_id: String,
}

impl Request<Result<EnsureInstanceResponse, OrchestratorError>> for EnsureInstanceCommand {}

#[tracing::instrument(skip(orchestrator))]
pub async fn handle(
    orchestrator: Arc<AdapterInstanceOrchestrator>,
    command: EnsureInstanceCommand,
) -> Result<EnsureInstanceResponse, OrchestratorError> {
    let compute_unit_id = orchestrator.ensure(command.instance_guid).await?;

    Ok(EnsureInstanceResponse {
        instance_guid: command.instance_guid,
        compute_unit_id,
    })
}
