//! Delivery-guarantee tests for the MessageBox
//!
//! Exercises the core correctness property under concurrent
//! publish/consume/sweep interleavings: no message is purged while a
//! destination still needs it, and no destination can stall the sweep
//! for a message it was never subscribed to.

use std::sync::Arc;

use relay_broker::memory::InMemoryMessageStore;
use relay_broker::message_store::MessageStore;
use relay_broker::types::{DeliveryOutcome, NewMessage, SubscriptionStatus};
use relay_common::AdapterType;

fn new_message(interface: &str) -> NewMessage {
    NewMessage {
        interface_name: interface.to_string(),
        producing_adapter_name: "delimited-file".to_string(),
        producing_adapter_type: AdapterType::Source,
        payload: serde_json::json!({"columns": [], "values": []}),
        payload_checksum: None,
    }
}

/// Tiny deterministic generator so the interleaving test is reproducible
/// without pulling in a random-number dependency.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

/// Randomized interleavings of publish, consume, and sweep never violate
/// the guaranteed-delivery invariant: while a consumer holds a pending
/// claim, its message is present in the store.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_publish_consume_sweep_preserves_messages() {
    const MESSAGES: usize = 60;
    let subscribers = ["warehouse".to_string(), "billing".to_string()];

    let store = Arc::new(InMemoryMessageStore::new());

    // Publisher: MESSAGES records, each fanned out to both subscribers
    let publisher = {
        let store = store.clone();
        let subscribers = subscribers.clone();
        tokio::spawn(async move {
            for i in 0..MESSAGES {
                store
                    .publish(new_message("orders"), &subscribers)
                    .await
                    .unwrap();
                if i % 7 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        })
    };

    // Sweeper: runs continuously and aggressively during the whole test
    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    let sweeper = {
        let store = store.clone();
        let mut stop = stop_rx.clone();
        tokio::spawn(async move {
            loop {
                if *stop.borrow_and_update() {
                    break;
                }
                store.sweep().await.unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    // Consumers: claim, verify the invariant, occasionally fail and
    // retry, then acknowledge
    let mut consumers = Vec::new();
    for (idx, subscriber) in subscribers.iter().enumerate() {
        let store = store.clone();
        let subscriber = subscriber.clone();
        consumers.push(tokio::spawn(async move {
            let mut rng = Lcg(0x9e3779b97f4a7c15 ^ idx as u64);
            let mut processed = 0usize;
            let mut idle_rounds = 0usize;

            while processed < MESSAGES {
                let deliveries = store.claim_pending(&subscriber, 8).await.unwrap();
                if deliveries.is_empty() {
                    idle_rounds += 1;
                    assert!(idle_rounds < 100_000, "consumer starved");
                    tokio::task::yield_now().await;
                    continue;
                }
                idle_rounds = 0;

                for delivery in deliveries {
                    // The invariant under test: a claimed-but-pending
                    // message must still be in the box, sweeps
                    // notwithstanding.
                    let message = store.get_message(delivery.message_id).await.unwrap();
                    assert!(
                        message.is_some(),
                        "message {} swept away while subscription pending",
                        delivery.message_id
                    );

                    if rng.next() % 5 == 0 {
                        // Fail first, then operator-retry and complete on
                        // the next claim round
                        store
                            .complete_subscription(
                                delivery.subscription_id,
                                DeliveryOutcome::Error {
                                    message: "transient".to_string(),
                                },
                            )
                            .await
                            .unwrap();
                        store
                            .retry_subscription(delivery.subscription_id)
                            .await
                            .unwrap();
                        continue;
                    }

                    let applied = store
                        .complete_subscription(
                            delivery.subscription_id,
                            DeliveryOutcome::Processed { details: None },
                        )
                        .await
                        .unwrap();
                    if applied {
                        processed += 1;
                    }
                }
                tokio::task::yield_now().await;
            }
        }));
    }

    publisher.await.unwrap();
    for consumer in consumers {
        consumer.await.unwrap();
    }
    stop_tx.send(true).unwrap();
    sweeper.await.unwrap();

    // Everything acknowledged: one final sweep drains the box
    let report = store.sweep().await.unwrap();
    assert_eq!(report.messages_retained_error, 0);
    let leftovers = store
        .list_pending_messages("orders", None, i64::MAX)
        .await
        .unwrap();
    assert!(leftovers.is_empty());
}

/// Once every subscription of a message is processed, the next sweep
/// removes the message and its subscriptions.
#[tokio::test]
async fn sweep_collects_fully_processed_messages_in_one_cycle() {
    let store = InMemoryMessageStore::new();
    let receipt = store
        .publish(new_message("orders"), &["warehouse".to_string(), "billing".to_string()])
        .await
        .unwrap();

    for subscription_id in &receipt.subscription_ids {
        store
            .complete_subscription(*subscription_id, DeliveryOutcome::Processed { details: None })
            .await
            .unwrap();
    }

    let report = store.sweep().await.unwrap();
    assert_eq!(report.messages_deleted, 1);
    assert_eq!(report.subscriptions_deleted, 2);

    assert!(store.get_message(receipt.message_id).await.unwrap().is_none());
    assert!(store
        .subscriptions_for(receipt.message_id)
        .await
        .unwrap()
        .is_empty());
}

/// A message with a pending subscription survives any number of sweeps.
#[tokio::test]
async fn sweep_never_removes_partially_acknowledged_messages() {
    let store = InMemoryMessageStore::new();
    let receipt = store
        .publish(new_message("orders"), &["warehouse".to_string(), "billing".to_string()])
        .await
        .unwrap();

    store
        .complete_subscription(
            receipt.subscription_ids[0],
            DeliveryOutcome::Processed { details: None },
        )
        .await
        .unwrap();

    for _ in 0..5 {
        let report = store.sweep().await.unwrap();
        assert_eq!(report.messages_deleted, 0);
    }
    assert!(store.get_message(receipt.message_id).await.unwrap().is_some());
}

/// The end-to-end scenario: two destinations, one fails, the message is
/// retained until the operator retry completes, then collected.
#[tokio::test]
async fn error_subscription_retains_message_until_retry_completes() {
    let store = InMemoryMessageStore::new();
    let receipt = store
        .publish(new_message("orders"), &["warehouse".to_string(), "billing".to_string()])
        .await
        .unwrap();
    assert_eq!(receipt.subscription_ids.len(), 2);

    // Destination A completes, destination B fails
    let claimed_a = store.claim_pending("warehouse", 10).await.unwrap();
    assert_eq!(claimed_a.len(), 1);
    store
        .complete_subscription(
            claimed_a[0].subscription_id,
            DeliveryOutcome::Processed {
                details: Some("rows=1".to_string()),
            },
        )
        .await
        .unwrap();

    let claimed_b = store.claim_pending("billing", 10).await.unwrap();
    store
        .complete_subscription(
            claimed_b[0].subscription_id,
            DeliveryOutcome::Error {
                message: "target unavailable".to_string(),
            },
        )
        .await
        .unwrap();

    // Not collected: B is in error, retained for operator inspection
    let report = store.sweep().await.unwrap();
    assert_eq!(report.messages_deleted, 0);
    assert_eq!(report.messages_retained_error, 1);
    assert!(store.get_message(receipt.message_id).await.unwrap().is_some());

    let subs = store.subscriptions_for(receipt.message_id).await.unwrap();
    let errored = subs
        .iter()
        .find(|s| s.status == SubscriptionStatus::Error)
        .unwrap();
    assert_eq!(errored.error_message.as_deref(), Some("target unavailable"));

    // Operator retry: B reprocesses successfully
    assert!(store.retry_subscription(errored.id).await.unwrap());
    let reclaimed = store.claim_pending("billing", 10).await.unwrap();
    assert_eq!(reclaimed.len(), 1);
    store
        .complete_subscription(
            reclaimed[0].subscription_id,
            DeliveryOutcome::Processed { details: None },
        )
        .await
        .unwrap();

    // Next sweep deletes the message and both subscription rows
    let report = store.sweep().await.unwrap();
    assert_eq!(report.messages_deleted, 1);
    assert_eq!(report.subscriptions_deleted, 2);
    assert!(store.get_message(receipt.message_id).await.unwrap().is_none());
}

/// Concurrent duplicate acknowledgements of one subscription: exactly one
/// terminal write is applied.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn duplicate_acknowledgements_apply_exactly_once() {
    let store = Arc::new(InMemoryMessageStore::new());
    let receipt = store
        .publish(new_message("orders"), &["warehouse".to_string()])
        .await
        .unwrap();
    let subscription_id = receipt.subscription_ids[0];

    let mut attempts = Vec::new();
    for i in 0..10 {
        let store = store.clone();
        attempts.push(tokio::spawn(async move {
            let outcome = if i % 2 == 0 {
                DeliveryOutcome::Processed { details: None }
            } else {
                DeliveryOutcome::Error {
                    message: format!("attempt {i}"),
                }
            };
            store.complete_subscription(subscription_id, outcome).await.unwrap()
        }));
    }

    let mut applied = 0;
    for attempt in attempts {
        if attempt.await.unwrap() {
            applied += 1;
        }
    }
    assert_eq!(applied, 1);

    let subs = store.subscriptions_for(receipt.message_id).await.unwrap();
    assert!(subs[0].status.is_terminal());
}
