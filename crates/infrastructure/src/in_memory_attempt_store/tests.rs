use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use gatehouse_application::AttemptStore;
use gatehouse_domain::AttemptKey;

use super::InMemoryAttemptStore;

fn key(identifier: &str) -> AttemptKey {
    AttemptKey::new("127.0.0.1", identifier).unwrap_or_else(|_| unreachable!())
}

#[tokio::test]
async fn first_increment_creates_record() {
    let store = InMemoryAttemptStore::new();
    let now = Utc::now();

    let record = store
        .increment(&key("a@b.com"), now, TimeDelta::minutes(15))
        .await;
    assert!(record.is_ok());

    let record = record.unwrap_or_else(|_| unreachable!());
    assert_eq!(record.stored_count(), 1);
    assert_eq!(record.last_reset(), now);
}

#[tokio::test]
async fn increments_restart_after_window() {
    let store = InMemoryAttemptStore::new();
    let start = Utc::now();
    let window = TimeDelta::minutes(15);

    for _ in 0..3 {
        let result = store.increment(&key("a@b.com"), start, window).await;
        assert!(result.is_ok());
    }

    let restarted = store
        .increment(&key("a@b.com"), start + TimeDelta::minutes(20), window)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(restarted.stored_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_increments_serialize_per_key() {
    let store = Arc::new(InMemoryAttemptStore::new());
    let now = Utc::now();
    let mut tasks = tokio::task::JoinSet::new();

    for _ in 0..50 {
        let store = store.clone();
        tasks.spawn(async move {
            store
                .increment(&key("a@b.com"), now, TimeDelta::minutes(15))
                .await
        });
    }

    while let Some(result) = tasks.join_next().await {
        assert!(matches!(result, Ok(Ok(_))));
    }

    let found = store.find(&key("a@b.com")).await.unwrap_or_default();
    assert_eq!(found.map(|record| record.stored_count()), Some(50));
}

#[tokio::test]
async fn purge_keeps_recent_windows() {
    let store = InMemoryAttemptStore::new();
    let now = Utc::now();
    let window = TimeDelta::minutes(15);

    let _ = store
        .increment(&key("old@b.com"), now - TimeDelta::days(2), window)
        .await;
    let _ = store.increment(&key("new@b.com"), now, window).await;

    let purged = store.purge_expired(now - TimeDelta::days(1)).await;
    assert_eq!(purged.ok(), Some(1));
    assert!(matches!(store.find(&key("old@b.com")).await, Ok(None)));
    assert!(matches!(store.find(&key("new@b.com")).await, Ok(Some(_))));
}
