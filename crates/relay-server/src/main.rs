//! Relay Server - Main entry point

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tracing::info;

use relay_broker::config_store::AdapterConfigStore;
use relay_broker::instance_store::InstanceStore;
use relay_broker::memory::{InMemoryConfigStore, InMemoryInstanceStore, InMemoryMessageStore};
use relay_broker::message_store::MessageStore;
use relay_broker::pg::{PgConfigStore, PgInstanceStore, PgMessageStore};
use relay_broker::sweeper::{Sweeper, SweeperConfig};
use relay_common::logging::{init_logging, LogConfig};

use relay_server::config::{Config, ProvisionerKind};
use relay_server::features::{self, FeatureState};
use relay_server::middleware;
use relay_server::orchestrator::memory::InMemoryProvisioner;
use relay_server::orchestrator::process::{ProcessProvisioner, ProcessProvisionerConfig};
use relay_server::orchestrator::{
    AdapterInstanceOrchestrator, ComputeProvisioner, OrchestratorConfig,
};

/// Application state shared across root handlers
#[derive(Clone)]
struct AppState {
    messages: Arc<dyn MessageStore>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with configuration from environment
    let log_config = LogConfig::builder()
        .log_file_prefix("relay-server".to_string())
        .filter_directives("relay_server=debug,tower_http=debug,axum=trace,sqlx=info".to_string())
        .build();

    // Merge with environment variables (they take precedence)
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    init_logging(&log_config)?;

    info!("Starting Relay Server");

    // Load configuration
    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    // Wire stores: PostgreSQL normally, in-memory under the dry-run
    // provisioner (no database required)
    let (messages, instances, configs): (
        Arc<dyn MessageStore>,
        Arc<dyn InstanceStore>,
        Arc<dyn AdapterConfigStore>,
    ) = match config.orchestrator.provisioner {
        ProvisionerKind::Memory => {
            info!("Dry-run mode: in-memory stores, no database");
            (
                Arc::new(InMemoryMessageStore::new()),
                Arc::new(InMemoryInstanceStore::new()),
                Arc::new(InMemoryConfigStore::new()),
            )
        },
        ProvisionerKind::Process => {
            let pool = relay_broker::db::create_pool(&config.database).await?;
            info!("Database connection pool established");

            sqlx::migrate!("../../migrations")
                .run(&pool)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
            info!("Database migrations completed");

            (
                Arc::new(PgMessageStore::new(pool.clone())),
                Arc::new(PgInstanceStore::new(pool.clone())),
                Arc::new(PgConfigStore::new(pool)),
            )
        },
    };

    // Compute provisioner per configuration
    let provisioner: Arc<dyn ComputeProvisioner> = match config.orchestrator.provisioner {
        ProvisionerKind::Memory => Arc::new(InMemoryProvisioner::with_auto_run()),
        ProvisionerKind::Process => Arc::new(ProcessProvisioner::new(ProcessProvisionerConfig {
            worker_binary: PathBuf::from(&config.orchestrator.worker_binary),
            database_url: config.database.url.clone(),
        })),
    };

    let orchestrator = Arc::new(AdapterInstanceOrchestrator::new(
        provisioner,
        instances.clone(),
        configs,
        OrchestratorConfig {
            worker_image: config.orchestrator.worker_binary.clone(),
            ..OrchestratorConfig::default()
        },
    ));

    // Start the garbage-collection sweeper
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let sweeper = Sweeper::new(
        messages.clone(),
        SweeperConfig {
            interval_secs: config.sweeper.interval_secs,
        },
    );
    let sweeper_handle = sweeper.start(shutdown_rx);
    info!("Sweeper started");

    // Build the application router
    let state = AppState {
        messages: messages.clone(),
    };
    let feature_state = FeatureState {
        messages,
        instances,
        orchestrator,
    };
    let app = create_router(state, feature_state, &config);

    // Create socket address
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    // Stop the sweeper after its in-flight cycle
    let _ = shutdown_tx.send(true);
    let _ = sweeper_handle.await;

    info!("Server shut down gracefully");

    Ok(())
}

/// Create the application router with all routes and middleware
fn create_router(state: AppState, feature_state: FeatureState, config: &Config) -> Router {
    let feature_routes = features::router(feature_state);

    Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(get_stats))
        .with_state(state)
        .nest("/api/v1", feature_routes)
        // Apply layers from innermost to outermost
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Health check handler
async fn health_check(State(state): State<AppState>) -> Result<Response, StatusCode> {
    // A cheap read exercises the store path end to end
    match state.messages.counts_by_status("").await {
        Ok(_) => Ok((
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "store": "connected"
            })),
        )
            .into_response()),
        Err(e) => {
            tracing::error!("Store health check failed: {:?}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        },
    }
}

/// Broker statistics handler
async fn get_stats(
    State(state): State<AppState>,
    axum::extract::Query(params): axum::extract::Query<StatsParams>,
) -> impl IntoResponse {
    match state.messages.counts_by_status(&params.interface).await {
        Ok(counts) => (
            StatusCode::OK,
            Json(json!({
                "interface": params.interface,
                "subscriptions": {
                    "pending": counts.pending,
                    "processed": counts.processed,
                    "error": counts.error,
                }
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to fetch stats: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to fetch statistics" })),
            )
                .into_response()
        },
    }
}

#[derive(serde::Deserialize)]
struct StatsParams {
    #[serde(default)]
    interface: String,
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // Give ongoing requests time to complete
    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
