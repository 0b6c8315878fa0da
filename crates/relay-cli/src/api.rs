//! HTTP API client for the Relay server

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{CliError, Result};

// ============================================================================
// API Client Constants
// ============================================================================

/// Default timeout for API requests in seconds.
/// Can be overridden via RELAY_API_TIMEOUT_SECS.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

/// Default Relay server URL when not specified via environment variable.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct MessageSummary {
    pub id: Uuid,
    pub interface_name: String,
    pub producing_adapter_name: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionSummary {
    pub id: Uuid,
    pub subscriber_adapter_name: String,
    pub status: String,
    pub error_message: Option<String>,
    pub processing_details: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PendingMessageView {
    pub message: MessageSummary,
    pub subscriptions: Vec<SubscriptionSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListPendingResponse {
    pub messages: Vec<PendingMessageView>,
    pub total: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryResponse {
    pub subscription_id: Uuid,
    pub retried: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstanceSummary {
    pub instance_guid: Uuid,
    pub interface_name: String,
    pub instance_name: String,
    pub adapter_name: String,
    pub adapter_type: String,
    pub is_enabled: bool,
    pub compute_unit_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListInstancesResponse {
    pub instances: Vec<InstanceSummary>,
    pub total: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstanceStatusResponse {
    pub instance: InstanceSummary,
    pub compute_unit_id: String,
    pub status: String,
    pub detail: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

/// API client for the Relay server
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: String) -> Result<Self> {
        let timeout_secs = std::env::var("RELAY_API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_API_TIMEOUT_SECS);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("RELAY_SERVER_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());

        Self::new(base_url)
    }

    /// Check server health
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// List pending messages for an interface
    pub async fn list_pending(
        &self,
        interface: &str,
        subscriber: Option<&str>,
        limit: Option<i64>,
    ) -> Result<ListPendingResponse> {
        let url = format!("{}/api/v1/messages", self.base_url);

        let mut query: Vec<(&str, String)> = vec![("interface", interface.to_string())];
        if let Some(subscriber) = subscriber {
            query.push(("subscriber", subscriber.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    /// Get one message with its subscriptions
    pub async fn get_message(&self, message_id: Uuid) -> Result<PendingMessageView> {
        let url = format!("{}/api/v1/messages/{}", self.base_url, message_id);

        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(CliError::api(format!("Message {message_id} not found")));
        }

        Ok(response.error_for_status()?.json().await?)
    }

    /// Retry an errored subscription
    pub async fn retry_subscription(&self, subscription_id: Uuid) -> Result<RetryResponse> {
        let url = format!(
            "{}/api/v1/subscriptions/{}/retry",
            self.base_url, subscription_id
        );

        let response = self.client.post(&url).send().await?;
        match response.status() {
            StatusCode::CONFLICT => Err(CliError::api(format!(
                "Subscription {subscription_id} is not in error state"
            ))),
            _ => Ok(response.error_for_status()?.json().await?),
        }
    }

    /// List adapter instances
    pub async fn list_instances(&self, interface: Option<&str>) -> Result<ListInstancesResponse> {
        let url = format!("{}/api/v1/instances", self.base_url);

        let mut request = self.client.get(&url);
        if let Some(interface) = interface {
            request = request.query(&[("interface", interface)]);
        }

        let response = request.send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    /// Get orchestrator status for one instance
    pub async fn instance_status(&self, instance_guid: Uuid) -> Result<InstanceStatusResponse> {
        let url = format!(
            "{}/api/v1/instances/{}/status",
            self.base_url, instance_guid
        );

        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(CliError::api(format!("Instance {instance_guid} not found")));
        }

        Ok(response.error_for_status()?.json().await?)
    }
}
