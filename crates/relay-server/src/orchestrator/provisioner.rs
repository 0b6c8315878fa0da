//! Compute provisioner contract
//!
//! The boundary to the compute platform that runs adapter instance
//! workers. Only this contract is part of the core; the platform SDK
//! behind an implementation is not.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Lifecycle status of one compute unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum ComputeStatus {
    /// Requested but not yet running. Also what an unknown unit reads as:
    /// provisioning is asynchronous and callers must tolerate "not found
    /// yet" right after a create returns.
    Provisioning,
    Running,
    /// Scaled to zero or disabled
    Stopped,
    /// Provisioning or runtime failure, with detail
    Failed(String),
}

impl ComputeStatus {
    pub fn label(&self) -> &str {
        match self {
            ComputeStatus::Provisioning => "provisioning",
            ComputeStatus::Running => "running",
            ComputeStatus::Stopped => "stopped",
            ComputeStatus::Failed(_) => "failed",
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            ComputeStatus::Failed(detail) => Some(detail),
            _ => None,
        }
    }
}

/// Everything a platform needs to run one adapter instance worker
#[derive(Debug, Clone)]
pub struct ComputeUnitSpec {
    pub compute_unit_id: String,
    /// Worker image or binary, depending on the platform
    pub image: String,
    /// Identity and resolved settings, injected as environment variables
    pub env: Vec<(String, String)>,
}

#[async_trait]
pub trait ComputeProvisioner: Send + Sync {
    /// Create-or-get: if a unit with this id already exists it is
    /// returned unchanged, otherwise one is provisioned. Returns the
    /// compute unit id.
    async fn create(&self, spec: ComputeUnitSpec) -> anyhow::Result<String>;

    /// Pure status read against the platform
    async fn status(&self, compute_unit_id: &str) -> anyhow::Result<ComputeStatus>;

    /// Stop/remove a unit. A no-op (not an error) for units that were
    /// never successfully provisioned.
    async fn stop(&self, compute_unit_id: &str) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        assert_eq!(ComputeStatus::Provisioning.label(), "provisioning");
        assert_eq!(ComputeStatus::Failed("boom".to_string()).label(), "failed");
        assert_eq!(
            ComputeStatus::Failed("boom".to_string()).detail(),
            Some("boom")
        );
        assert_eq!(ComputeStatus::Running.detail(), None);
    }
}
