//! Stop an instance's compute unit

use mediator::Request;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::orchestrator::{AdapterInstanceOrchestrator, OrchestratorError};

/// Command to tear down an instance's compute unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopInstanceCommand {
    pub instance_guid: Uuid,
}

/// Response from the stop command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopInstanceResponse {
    pub instance_guid: Uuid,
    pub stopped: bool,
}

impl Request<Result<StopInstanceResponse, OrchestratorError>> for StopInstanceCommand {}

#[tracing::instrument(skip(orchestrator))]
pub async fn handle(
    orchestrator: Arc<AdapterInstanceOrchestrator>,
    command: StopInstanceCommand,
) -> Result<StopInstanceResponse, OrchestratorError> {
    orchestrator.teardown(command.instance_guid).await?;

    Ok(StopInstanceResponse {
        instance_guid: command.instance_guid,
        stopped: true,
    })
}
