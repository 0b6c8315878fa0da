//! Instance routes
//!
//! Inspection of configured adapter instances and thin pass-throughs to
//! the orchestrator. Instance CRUD (creating bindings, editing settings)
//! stays with external configuration management.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use super::commands::ensure_instance::handle as handle_ensure;
use super::commands::stop_instance::handle as handle_stop;
use super::commands::{EnsureInstanceCommand, StopInstanceCommand};
use super::queries::get_status::handle as handle_get_status;
use super::queries::list_instances::handle as handle_list;
use super::queries::{GetInstanceStatusQuery, ListInstancesQuery};
use crate::features::FeatureState;
use crate::orchestrator::OrchestratorError;

/// Create instance routes
pub fn instances_routes() -> Router<FeatureState> {
    Router::new()
        .route("/", get(list_instances))
        .route("/:instance_guid/status", get(get_status))
        .route("/:instance_guid/ensure", post(ensure_instance))
        .route("/:instance_guid/stop", post(stop_instance))
}

/// List adapter instances
///
/// GET /instances?interface=orders
async fn list_instances(
    State(state): State<FeatureState>,
    Query(query): Query<ListInstancesQuery>,
) -> Result<Response, StatusCode> {
    match handle_list(state.instances.clone(), query).await {
        Ok(response) => Ok((StatusCode::OK, Json(json!(response))).into_response()),
        Err(e) => {
            tracing::error!("Failed to list instances: {:?}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        },
    }
}

/// Get orchestrator status for one instance
///
/// GET /instances/:instance_guid/status
async fn get_status(
    State(state): State<FeatureState>,
    Path(instance_guid): Path<Uuid>,
) -> Result<Response, StatusCode> {
    match handle_get_status(
        state.instances.clone(),
        state.orchestrator.clone(),
        GetInstanceStatusQuery { instance_guid },
    )
    .await
    {
        Ok(response) => Ok((StatusCode::OK, Json(json!(response))).into_response()),
        Err(e) => {
            tracing::debug!("Instance not found or error: {:?}", e);
            Err(StatusCode::NOT_FOUND)
        },
    }
}

/// Ensure an instance's compute unit
///
/// POST /instances/:instance_guid/ensure
async fn ensure_instance(
    State(state): State<FeatureState>,
    Path(instance_guid): Path<Uuid>,
) -> Result<Response, StatusCode> {
    match handle_ensure(
        state.orchestrator.clone(),
        EnsureInstanceCommand { instance_guid },
    )
    .await
    {
        Ok(response) => Ok((StatusCode::OK, Json(json!(response))).into_response()),
        Err(OrchestratorError::InstanceNotFound(_)) => Err(StatusCode::NOT_FOUND),
        Err(OrchestratorError::InstanceDisabled(_)) => Err(StatusCode::CONFLICT),
        Err(OrchestratorError::InvalidConfig(e)) => {
            tracing::warn!("Instance configuration invalid: {}", e);
            Err(StatusCode::BAD_REQUEST)
        },
        Err(e) => {
            tracing::error!("Failed to ensure instance: {:?}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        },
    }
}

/// Stop an instance's compute unit
///
/// POST /instances/:instance_guid/stop
async fn stop_instance(
    State(state): State<FeatureState>,
    Path(instance_guid): Path<Uuid>,
) -> Result<Response, StatusCode> {
    match handle_stop(
        state.orchestrator.clone(),
        StopInstanceCommand { instance_guid },
    )
    .await
    {
        Ok(response) => Ok((StatusCode::OK, Json(json!(response))).into_response()),
        Err(e) => {
            tracing::error!("Failed to stop instance: {:?}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_instance_routes_exist() {
        // Test that routes can be built
        let _router = instances_routes();
    }
}
