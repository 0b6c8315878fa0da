//! Feature modules implementing the Relay inspection API
//!
//! Vertical slices following the CQRS pattern: each feature carries its
//! own commands (writes), queries (reads), and routes. The surface is
//! read-mostly — the broker's inspection boundary plus the operator
//! retry and the orchestrator pass-throughs. Interface and adapter CRUD
//! belongs to external configuration management and is deliberately
//! absent.

pub mod instances;
pub mod messages;

use axum::Router;
use std::sync::Arc;

use relay_broker::instance_store::InstanceStore;
use relay_broker::message_store::MessageStore;

use crate::orchestrator::AdapterInstanceOrchestrator;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// MessageBox store for message/subscription inspection
    pub messages: Arc<dyn MessageStore>,
    /// Adapter instance registry
    pub instances: Arc<dyn InstanceStore>,
    /// Compute lifecycle orchestrator
    pub orchestrator: Arc<AdapterInstanceOrchestrator>,
}

/// Creates the API router with all feature routes mounted
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .nest("/messages", messages::messages_routes().with_state(state.clone()))
        .nest(
            "/subscriptions",
            messages::subscriptions_routes().with_state(state.clone()),
        )
        .nest("/instances", instances::instances_routes().with_state(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_broker::memory::{InMemoryConfigStore, InMemoryInstanceStore, InMemoryMessageStore};

    use crate::orchestrator::memory::InMemoryProvisioner;
    use crate::orchestrator::OrchestratorConfig;

    #[tokio::test]
    async fn test_feature_router_builds() {
        let instances = Arc::new(InMemoryInstanceStore::new());
        let state = FeatureState {
            messages: Arc::new(InMemoryMessageStore::new()),
            instances: instances.clone(),
            orchestrator: Arc::new(AdapterInstanceOrchestrator::new(
                Arc::new(InMemoryProvisioner::new()),
                instances,
                Arc::new(InMemoryConfigStore::new()),
                OrchestratorConfig::default(),
            )),
        };

        let _router = router(state);
    }
}
