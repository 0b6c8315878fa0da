//! Garbage-collection sweeper
//!
//! Periodically deletes MessageBox entries whose every subscription is
//! processed. Runs concurrently with consumers; the store's sweep
//! evaluates its deletion predicate from a single consistent read, so a
//! message whose last subscription is flipping to processed is either
//! kept for the next cycle or deleted together with its rows — never
//! half-deleted.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::message_store::MessageStore;

/// Sweeper configuration
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    pub interval_secs: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

/// Background garbage-collection task over a message store
pub struct Sweeper {
    store: Arc<dyn MessageStore>,
    config: SweeperConfig,
}

impl Sweeper {
    pub fn new(store: Arc<dyn MessageStore>, config: SweeperConfig) -> Self {
        Self { store, config }
    }

    /// Spawn the sweep loop. Dropping a `true` into the returned channel's
    /// sender counterpart (held by the caller) stops the loop after the
    /// in-flight sweep.
    pub fn start(self, mut shutdown: watch::Receiver<bool>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = self.config.interval_secs, "Sweeper started");

            let mut ticker = interval(Duration::from_secs(self.config.interval_secs.max(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sweep_once().await;
                    },
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            info!("Sweeper stopping");
                            break;
                        }
                    },
                }
            }
        })
    }

    /// Run one sweep cycle, logging the outcome
    pub async fn sweep_once(&self) {
        match self.store.sweep().await {
            Ok(report) => {
                if report.messages_deleted > 0 || report.messages_retained_error > 0 {
                    info!(
                        messages_deleted = report.messages_deleted,
                        subscriptions_deleted = report.subscriptions_deleted,
                        retained_on_error = report.messages_retained_error,
                        "Sweep completed"
                    );
                } else {
                    debug!("Sweep completed, nothing to collect");
                }
            },
            Err(e) => {
                // A failed sweep degrades nothing; entries are collected
                // by a later cycle.
                error!(error = %e, "Sweep failed");
            },
        }
    }
}
