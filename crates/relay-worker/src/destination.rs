//! JSON-lines file destination adapter
//!
//! Polls pending subscriptions for the instance's adapter name, appends
//! one JSON line per delivered message to the output file, and
//! acknowledges each subscription with a terminal status. Delivery is
//! at-least-once: a crash between the write and the acknowledgement
//! replays the message, and downstream consumers are assumed
//! idempotent.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use relay_broker::message_store::MessageStore;
use relay_broker::types::{DeliveryOutcome, PendingDelivery};
use relay_common::AdapterIdentity;

use crate::backoff::Backoff;

/// Default base poll interval in seconds
const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;

/// Empty-poll backoff ceiling
const MAX_POLL_INTERVAL_SECS: u64 = 30;

/// Default subscriptions claimed per poll
const DEFAULT_BATCH_SIZE: i64 = 50;

/// Resolved settings of the jsonl-file destination
#[derive(Debug, Clone)]
pub struct DestinationSettings {
    pub output_path: PathBuf,
    pub poll_interval: Duration,
    pub batch_size: i64,
}

impl DestinationSettings {
    /// Build from the generic settings bag
    pub fn from_map(settings: &HashMap<String, String>) -> Result<Self> {
        let output_path = settings
            .get("output_path")
            .context("Missing required setting 'output_path'")?;

        let poll_interval_secs = match settings.get("poll_interval_secs") {
            None => DEFAULT_POLL_INTERVAL_SECS,
            Some(raw) => raw
                .parse()
                .context("Setting 'poll_interval_secs' must be a positive integer")?,
        };

        let batch_size = match settings.get("batch_size") {
            None => DEFAULT_BATCH_SIZE,
            Some(raw) => raw
                .parse()
                .context("Setting 'batch_size' must be a positive integer")?,
        };
        anyhow::ensure!(batch_size > 0, "Setting 'batch_size' must be greater than zero");

        Ok(Self {
            output_path: PathBuf::from(output_path),
            poll_interval: Duration::from_secs(poll_interval_secs.max(1)),
            batch_size,
        })
    }
}

/// Running totals of one destination loop
#[derive(Debug, Clone, Copy, Default)]
pub struct DeliveryStats {
    pub processed: usize,
    pub errored: usize,
}

/// Claim-and-process until no pending subscriptions remain.
///
/// Each delivery is acknowledged individually; a failed write marks only
/// its own subscription as errored and keeps its message retained for
/// retry.
pub async fn drain(
    store: &Arc<dyn MessageStore>,
    identity: &AdapterIdentity,
    settings: &DestinationSettings,
) -> Result<DeliveryStats> {
    let mut stats = DeliveryStats::default();

    loop {
        let deliveries = store
            .claim_pending(&identity.adapter_name, settings.batch_size)
            .await?;
        if deliveries.is_empty() {
            return Ok(stats);
        }

        for delivery in deliveries {
            process_delivery(store, settings, &delivery, &mut stats).await?;
        }
    }
}

/// The destination poll loop: drain, back off while idle, stop on
/// shutdown after finishing the in-flight batch.
pub async fn run(
    store: Arc<dyn MessageStore>,
    identity: &AdapterIdentity,
    settings: &DestinationSettings,
    mut shutdown: watch::Receiver<bool>,
) -> Result<DeliveryStats> {
    let mut totals = DeliveryStats::default();
    let mut backoff = Backoff::new(
        settings.poll_interval,
        Duration::from_secs(MAX_POLL_INTERVAL_SECS),
    );

    info!(
        subscriber = %identity.adapter_name,
        output = %settings.output_path.display(),
        "Destination loop started"
    );

    loop {
        if *shutdown.borrow() {
            break;
        }

        let stats = drain(&store, identity, settings).await?;
        totals.processed += stats.processed;
        totals.errored += stats.errored;

        if stats.processed > 0 || stats.errored > 0 {
            backoff.reset();
            continue;
        }

        let delay = backoff.next();
        debug!(delay_ms = delay.as_millis() as u64, "No pending deliveries, backing off");
        tokio::select! {
            _ = tokio::time::sleep(delay) => {},
            _ = shutdown.changed() => {},
        }
    }

    info!(
        processed = totals.processed,
        errored = totals.errored,
        "Destination loop stopped"
    );

    Ok(totals)
}

async fn process_delivery(
    store: &Arc<dyn MessageStore>,
    settings: &DestinationSettings,
    delivery: &PendingDelivery,
    stats: &mut DeliveryStats,
) -> Result<()> {
    match append_jsonl(settings, delivery).await {
        Ok(details) => {
            // Conditional write: a duplicate claim after a crash is
            // absorbed here without a second side effect being counted.
            let applied = store
                .complete_subscription(
                    delivery.subscription_id,
                    DeliveryOutcome::Processed {
                        details: Some(details),
                    },
                )
                .await?;
            if applied {
                stats.processed += 1;
            }
        },
        Err(e) => {
            warn!(
                message_id = %delivery.message_id,
                error = %e,
                "Delivery failed"
            );
            store
                .complete_subscription(
                    delivery.subscription_id,
                    DeliveryOutcome::Error {
                        message: e.to_string(),
                    },
                )
                .await?;
            stats.errored += 1;
        },
    }

    Ok(())
}

/// Append one JSON line for a delivered message
async fn append_jsonl(
    settings: &DestinationSettings,
    delivery: &PendingDelivery,
) -> Result<String> {
    let line = serde_json::json!({
        "message_id": delivery.message_id,
        "interface": delivery.interface_name,
        "payload": delivery.payload,
    });

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&settings.output_path)
        .await
        .with_context(|| format!("Failed to open {}", settings.output_path.display()))?;

    file.write_all(format!("{line}\n").as_bytes())
        .await
        .context("Failed to append delivery")?;
    file.flush().await.context("Failed to flush delivery")?;

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    Ok(format!(
        "written to {} on {}",
        settings.output_path.display(),
        host
    ))
}
