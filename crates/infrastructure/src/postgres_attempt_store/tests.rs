use std::sync::Arc;

use chrono::{SubsecRound, TimeDelta, Utc};
use gatehouse_application::AttemptStore;
use gatehouse_domain::AttemptKey;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::PostgresAttemptStore;
use crate::MIGRATOR;

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(8)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres attempt store tests: {error}");
    }

    Some(pool)
}

fn unique_key() -> AttemptKey {
    AttemptKey::new("10.0.0.1", format!("{}@example.com", Uuid::new_v4()))
        .unwrap_or_else(|_| unreachable!())
}

fn window() -> TimeDelta {
    TimeDelta::minutes(15)
}

#[tokio::test]
async fn increment_accumulates_within_window() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let store = PostgresAttemptStore::new(pool);
    let key = unique_key();
    let start = Utc::now().trunc_subsecs(0);

    let first = store.increment(&key, start, window()).await;
    assert!(first.is_ok());
    let second = store
        .increment(&key, start + TimeDelta::minutes(2), window())
        .await;
    assert!(second.is_ok());

    let second = second.unwrap_or_else(|_| unreachable!());
    assert_eq!(second.stored_count(), 2);
    assert_eq!(second.last_reset(), start);
    assert_eq!(second.last_attempt(), start + TimeDelta::minutes(2));

    let found = store.find(&key).await;
    assert!(found.is_ok());
    assert_eq!(
        found
            .unwrap_or_default()
            .map(|record| record.stored_count()),
        Some(2)
    );
}

#[tokio::test]
async fn increment_after_window_restarts_at_one() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let store = PostgresAttemptStore::new(pool);
    let key = unique_key();
    let start = Utc::now().trunc_subsecs(0);

    for _ in 0..5 {
        let result = store.increment(&key, start, window()).await;
        assert!(result.is_ok());
    }

    let later = start + TimeDelta::minutes(16);
    let restarted = store.increment(&key, later, window()).await;
    assert!(restarted.is_ok());

    let restarted = restarted.unwrap_or_else(|_| unreachable!());
    assert_eq!(restarted.stored_count(), 1);
    assert_eq!(restarted.last_reset(), later);
}

#[tokio::test]
async fn concurrent_increments_are_not_lost() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let store = Arc::new(PostgresAttemptStore::new(pool));
    let key = unique_key();
    let now = Utc::now();
    let mut tasks = tokio::task::JoinSet::new();

    for _ in 0..20 {
        let store = store.clone();
        let key = key.clone();
        tasks.spawn(async move { store.increment(&key, now, TimeDelta::minutes(15)).await });
    }

    while let Some(result) = tasks.join_next().await {
        assert!(matches!(result, Ok(Ok(_))));
    }

    let found = store.find(&key).await.unwrap_or_default();
    assert_eq!(found.map(|record| record.stored_count()), Some(20));
}

#[tokio::test]
async fn purge_removes_only_old_windows() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let store = PostgresAttemptStore::new(pool);
    let old_key = unique_key();
    let fresh_key = unique_key();
    let now = Utc::now();

    let old = store
        .increment(&old_key, now - TimeDelta::days(3), window())
        .await;
    assert!(old.is_ok());
    let fresh = store.increment(&fresh_key, now, window()).await;
    assert!(fresh.is_ok());

    let purged = store.purge_expired(now - TimeDelta::days(1)).await;
    assert!(purged.is_ok_and(|count| count >= 1));

    assert!(matches!(store.find(&old_key).await, Ok(None)));
    assert!(matches!(store.find(&fresh_key).await, Ok(Some(_))));
}

#[tokio::test]
async fn missing_key_reads_as_none() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let store = PostgresAttemptStore::new(pool);
    assert!(matches!(store.find(&unique_key()).await, Ok(None)));
}
