use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use gatehouse_application::AttemptStore;
use gatehouse_core::AppResult;
use gatehouse_domain::{AttemptKey, AttemptRecord};
use tokio::sync::RwLock;

#[cfg(test)]
mod tests;

/// In-memory attempt store for single-process deployments and tests.
///
/// The write lock is held across each read-modify-write, which serializes
/// increments for every key.
#[derive(Debug, Default)]
pub struct InMemoryAttemptStore {
    records: RwLock<HashMap<AttemptKey, AttemptRecord>>,
}

impl InMemoryAttemptStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl AttemptStore for InMemoryAttemptStore {
    async fn find(&self, key: &AttemptKey) -> AppResult<Option<AttemptRecord>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn increment(
        &self,
        key: &AttemptKey,
        now: DateTime<Utc>,
        window: TimeDelta,
    ) -> AppResult<AttemptRecord> {
        let mut records = self.records.write().await;

        let updated = match records.remove(key) {
            Some(existing) => existing.record_failure(now, window),
            None => AttemptRecord::first_failure(key.clone(), now),
        };
        records.insert(key.clone(), updated.clone());

        Ok(updated)
    }

    async fn purge_expired(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let mut records = self.records.write().await;
        let initial = records.len();
        records.retain(|_, record| record.last_reset() >= before);

        Ok(u64::try_from(initial - records.len()).unwrap_or(u64::MAX))
    }
}
