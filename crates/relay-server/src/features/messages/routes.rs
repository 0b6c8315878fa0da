//! Message routes
//!
//! Read-only inspection of in-flight MessageBox traffic, plus the
//! operator retry endpoint. These routes never publish or consume
//! messages.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use super::commands::retry_subscription::{handle as handle_retry, RetrySubscriptionError};
use super::commands::RetrySubscriptionCommand;
use super::queries::get_message::handle as handle_get_message;
use super::queries::list_pending::handle as handle_list_pending;
use super::queries::{GetMessageQuery, ListPendingQuery};
use crate::features::FeatureState;

/// Create message routes
pub fn messages_routes() -> Router<FeatureState> {
    Router::new()
        .route("/", get(list_pending))
        .route("/:message_id", get(get_message))
}

/// Create subscription routes
pub fn subscriptions_routes() -> Router<FeatureState> {
    Router::new().route("/:subscription_id/retry", post(retry_subscription))
}

/// List pending messages for an interface
///
/// GET /messages?interface=orders&subscriber=warehouse&limit=50
async fn list_pending(
    State(state): State<FeatureState>,
    Query(query): Query<ListPendingQuery>,
) -> Result<Response, StatusCode> {
    match handle_list_pending(state.messages.clone(), query).await {
        Ok(response) => Ok((StatusCode::OK, Json(json!(response))).into_response()),
        Err(e) => {
            tracing::error!("Failed to list pending messages: {:?}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        },
    }
}

/// Get a specific message with its subscriptions
///
/// GET /messages/:message_id
async fn get_message(
    State(state): State<FeatureState>,
    Path(message_id): Path<Uuid>,
) -> Result<Response, StatusCode> {
    match handle_get_message(state.messages.clone(), GetMessageQuery { message_id }).await {
        Ok(response) => Ok((StatusCode::OK, Json(json!(response))).into_response()),
        Err(e) => {
            tracing::debug!("Message not found or error: {:?}", e);
            Err(StatusCode::NOT_FOUND)
        },
    }
}

/// Retry an errored subscription
///
/// POST /subscriptions/:subscription_id/retry
async fn retry_subscription(
    State(state): State<FeatureState>,
    Path(subscription_id): Path<Uuid>,
) -> Result<Response, StatusCode> {
    match handle_retry(
        state.messages.clone(),
        RetrySubscriptionCommand { subscription_id },
    )
    .await
    {
        Ok(response) => Ok((StatusCode::OK, Json(json!(response))).into_response()),
        Err(RetrySubscriptionError::NotRetryable(_)) => Err(StatusCode::CONFLICT),
        Err(e) => {
            tracing::error!("Failed to retry subscription: {:?}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        },
    }
}
