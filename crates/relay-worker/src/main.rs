//! Relay Worker - adapter instance runtime

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use relay_broker::adapters::validate_instance_config;
use relay_broker::message_box::MessageBox;
use relay_broker::message_store::MessageStore;
use relay_broker::pg::{PgConfigStore, PgInterfaceStore, PgMessageStore};
use relay_common::logging::{init_logging, LogConfig, LogLevel};
use relay_common::AdapterType;
use relay_worker::config::WorkerConfig;
use relay_worker::{destination, source};

#[derive(Parser, Debug)]
#[command(name = "relay-worker")]
#[command(author, version, about = "Relay adapter instance worker")]
struct Cli {
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbose flag
    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("relay-worker".to_string())
        .build();

    // Merge with environment variables (they take precedence)
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    init_logging(&log_config)?;

    let config = WorkerConfig::from_env().context("Incomplete worker identity")?;
    info!(
        instance_guid = %config.identity.instance_guid,
        interface = %config.identity.interface_name,
        adapter = %config.identity.adapter_name,
        adapter_type = %config.identity.adapter_type,
        "Worker starting"
    );

    let db_config = relay_broker::db::DbConfig::from_env()?;
    let pool = relay_broker::db::create_pool(&db_config).await?;

    // Resolve and validate the settings bag before touching any data
    let config_store = PgConfigStore::new(pool.clone());
    let settings = config.resolve_settings(&config_store).await?;
    validate_instance_config(
        &config.identity.adapter_name,
        config.identity.adapter_type,
        &settings,
    )?;

    let message_store: Arc<dyn MessageStore> = Arc::new(PgMessageStore::new(pool.clone()));

    match config.identity.adapter_type {
        AdapterType::Source => {
            let source_settings = source::SourceSettings::from_map(&settings)?;
            let interfaces = Arc::new(PgInterfaceStore::new(pool));
            let message_box = MessageBox::new(message_store, interfaces);

            let report = source::run(&message_box, &config.identity, &source_settings).await?;
            info!(
                published = report.published,
                rejected = report.rejected,
                failed = report.failed,
                "Source worker done"
            );
        },
        AdapterType::Destination => {
            let destination_settings = destination::DestinationSettings::from_map(&settings)?;

            // Disabling the instance stops the compute unit via signal;
            // the in-flight batch is drained before exit
            let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to install Ctrl+C handler: {}", e);
                }
                let _ = shutdown_tx.send(true);
            });

            let totals = destination::run(
                message_store,
                &config.identity,
                &destination_settings,
                shutdown_rx,
            )
            .await?;
            info!(
                processed = totals.processed,
                errored = totals.errored,
                "Destination worker done"
            );
        },
    }

    Ok(())
}
