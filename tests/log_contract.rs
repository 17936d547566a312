//! Integration tests for the log contract: version monotonicity, idempotent
//! append, conflict detection, cross-aggregate isolation and reconstitution
//! over a live log, including concurrent writers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use chairlog::{
    Aggregate, Event, InMemoryLog, Log, LogError, Result, event_names, load, reconstitute,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
enum ItemEvent {
    Stocked { amount: u64 },
    Bought { amount: u64 },
}

event_names! {
    ItemEvent {
        Stocked => "ItemStocked",
        Bought => "ItemBought",
    }
}

#[derive(Debug, Default)]
struct Item {
    amount_in_stock: i64,
}

impl Aggregate for Item {
    type Event = ItemEvent;

    fn applicable(name: &str) -> bool {
        matches!(name, "ItemStocked" | "ItemBought")
    }

    fn apply(&mut self, event: &ItemEvent) {
        match event {
            ItemEvent::Stocked { amount } => self.amount_in_stock += *amount as i64,
            ItemEvent::Bought { amount } => self.amount_in_stock -= *amount as i64,
        }
    }
}

fn stocked(aggregate_id: &str, version: u64, amount: u64) -> Event {
    Event::new(aggregate_id, version, ItemEvent::Stocked { amount }).unwrap()
}

#[tokio::test]
async fn streams_are_strictly_versioned_with_no_gaps() {
    let log = InMemoryLog::new();
    for version in 1..=5 {
        log.append(stocked("shoe-1", version, 1)).await.unwrap();
    }

    let versions: Vec<u64> = log
        .all_for_aggregate("shoe-1")
        .await
        .unwrap()
        .iter()
        .map(|event| event.aggregate_version)
        .collect();
    assert_eq!(versions, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn stock_then_buy_reconstitutes_current_stock() {
    let log = InMemoryLog::new();
    log.append(stocked("shoe-1", 1, 12)).await.unwrap();
    log.append(Event::new("shoe-1", 2, ItemEvent::Bought { amount: 5 }).unwrap())
        .await
        .unwrap();

    let item = load::<Item, _>(&log, "shoe-1").await.unwrap().unwrap();
    assert_eq!(item.state.amount_in_stock, 7);
    assert_eq!(item.version, 2);
}

#[tokio::test]
async fn stale_append_conflicts_and_reports_both_versions() {
    let log = InMemoryLog::new();
    log.append(stocked("board-1", 1, 1)).await.unwrap();

    let err = log.append(stocked("board-1", 1, 1)).await.unwrap_err();
    match err {
        LogError::Conflict {
            aggregate_id,
            expected,
            actual,
        } => {
            assert_eq!(aggregate_id, "board-1");
            assert_eq!(expected, 2);
            assert_eq!(actual, 1);
        }
        other => panic!("expected conflict, got {other:?}"),
    }

    // The rejected append left no trace.
    assert_eq!(log.all_for_aggregate("board-1").await.unwrap().len(), 1);
    assert_eq!(log.all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn retried_event_id_appends_exactly_once() {
    let log = InMemoryLog::new();
    let event = stocked("shoe-1", 1, 12).with_event_id("stock-shoe-1-once");

    log.append(event.clone()).await.unwrap();
    log.append(event).await.unwrap();

    let stream = log.all_for_aggregate("shoe-1").await.unwrap();
    assert_eq!(stream.len(), 1);

    let item = load::<Item, _>(&log, "shoe-1").await.unwrap().unwrap();
    assert_eq!(item.state.amount_in_stock, 12);
    assert_eq!(item.version, 1);
}

#[tokio::test]
async fn appends_to_one_aggregate_do_not_leak_into_another() {
    let log = InMemoryLog::new();
    log.append(stocked("shoe-1", 1, 3)).await.unwrap();
    log.append(stocked("hat-1", 1, 8)).await.unwrap();
    log.append(stocked("shoe-1", 2, 4)).await.unwrap();

    let hat = load::<Item, _>(&log, "hat-1").await.unwrap().unwrap();
    assert_eq!(hat.state.amount_in_stock, 8);
    assert_eq!(hat.version, 1);
}

#[tokio::test]
async fn never_written_aggregate_is_empty_and_absent() {
    let log = InMemoryLog::new();

    assert!(log.all_for_aggregate("never-used").await.unwrap().is_empty());
    assert!(
        load::<Item, _>(&log, "never-used")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn all_preserves_append_order_across_aggregates() {
    let log = InMemoryLog::new();
    log.append(stocked("a", 1, 1)).await.unwrap();
    log.append(stocked("b", 1, 1)).await.unwrap();
    log.append(stocked("a", 2, 1)).await.unwrap();

    let order: Vec<(String, u64)> = log
        .all()
        .await
        .unwrap()
        .iter()
        .map(|event| (event.aggregate_id.clone(), event.aggregate_version))
        .collect();
    assert_eq!(
        order,
        vec![
            ("a".to_string(), 1),
            ("b".to_string(), 1),
            ("a".to_string(), 2)
        ]
    );

    // Stable across repeated calls.
    assert_eq!(log.all().await.unwrap(), log.all().await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_to_distinct_aggregates_all_succeed() {
    let log = Arc::new(InMemoryLog::new());

    let mut handles = Vec::new();
    for writer in 0..16 {
        let log = Arc::clone(&log);
        handles.push(tokio::spawn(async move {
            let aggregate_id = format!("item-{writer}");
            for version in 1..=10 {
                log.append(stocked(&aggregate_id, version, 1)).await?;
            }
            Ok::<_, LogError>(())
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(log.all().await.unwrap().len(), 160);
    for writer in 0..16 {
        let aggregate_id = format!("item-{writer}");
        assert_eq!(log.current_version(&aggregate_id).await.unwrap(), 10);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn exactly_one_of_two_racing_same_version_appends_wins() {
    let log = Arc::new(InMemoryLog::new());
    log.append(stocked("shoe-1", 1, 10)).await.unwrap();

    // Both writers observed version 1 and race to append version 2.
    let first = {
        let log = Arc::clone(&log);
        tokio::spawn(async move { log.append(stocked("shoe-1", 2, 5)).await })
    };
    let second = {
        let log = Arc::clone(&log);
        tokio::spawn(async move { log.append(stocked("shoe-1", 2, 7)).await })
    };

    let outcomes = [first.await.unwrap(), second.await.unwrap()];
    let wins = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    let conflicts = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, Err(err) if err.is_conflict()))
        .count();

    assert_eq!(wins, 1);
    assert_eq!(conflicts, 1);
    assert_eq!(log.current_version("shoe-1").await.unwrap(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn contended_writers_converge_with_read_retry_discipline() {
    let log = Arc::new(InMemoryLog::new());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let log = Arc::clone(&log);
        handles.push(tokio::spawn(async move {
            loop {
                let version = log.current_version("shoe-1").await?;
                let event = stocked("shoe-1", version + 1, 1);
                match log.append(event).await {
                    Ok(()) => return Ok::<_, LogError>(()),
                    Err(err) if err.is_conflict() => continue,
                    Err(err) => return Err(err),
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stream = log.all_for_aggregate("shoe-1").await.unwrap();
    let versions: Vec<u64> = stream.iter().map(|event| event.aggregate_version).collect();
    assert_eq!(versions, (1..=8).collect::<Vec<u64>>());

    let item = reconstitute::<Item>(&stream).unwrap().unwrap();
    assert_eq!(item.state.amount_in_stock, 8);
}

#[tokio::test]
async fn log_is_usable_as_a_trait_object() {
    let log: Arc<dyn Log> = Arc::new(InMemoryLog::new());
    log.append(stocked("shoe-1", 1, 2)).await.unwrap();

    let item: Result<_> = load::<Item, dyn Log>(log.as_ref(), "shoe-1").await;
    assert_eq!(item.unwrap().unwrap().state.amount_in_stock, 2);
}
