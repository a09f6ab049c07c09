use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;

use gatehouse_core::{AppError, AppResult};
use gatehouse_domain::{AttemptKey, AttemptRecord, EmailAddress, UserId};

use crate::{AttemptStore, AuthEvent, AuthEventRepository, CredentialVerifier, UserRecord};

#[derive(Default)]
pub(crate) struct FakeAttemptStore {
    pub(crate) records: Mutex<HashMap<AttemptKey, AttemptRecord>>,
    pub(crate) fail_reads: AtomicBool,
    pub(crate) fail_writes: AtomicBool,
    pub(crate) writes: AtomicUsize,
    pub(crate) purged_before: Mutex<Vec<DateTime<Utc>>>,
}

impl FakeAttemptStore {
    pub(crate) async fn stored_count(&self, key: &AttemptKey) -> u32 {
        self.records
            .lock()
            .await
            .get(key)
            .map(AttemptRecord::stored_count)
            .unwrap_or(0)
    }

    pub(crate) async fn seed(&self, record: AttemptRecord) {
        self.records
            .lock()
            .await
            .insert(record.key().clone(), record);
    }
}

#[async_trait]
impl AttemptStore for FakeAttemptStore {
    async fn find(&self, key: &AttemptKey) -> AppResult<Option<AttemptRecord>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::Internal("attempt store is unavailable".to_owned()));
        }

        Ok(self.records.lock().await.get(key).cloned())
    }

    async fn increment(
        &self,
        key: &AttemptKey,
        now: DateTime<Utc>,
        window: TimeDelta,
    ) -> AppResult<AttemptRecord> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Internal("attempt store is unavailable".to_owned()));
        }

        let mut records = self.records.lock().await;
        let updated = match records.remove(key) {
            Some(existing) => existing.record_failure(now, window),
            None => AttemptRecord::first_failure(key.clone(), now),
        };
        records.insert(key.clone(), updated.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);

        Ok(updated)
    }

    async fn purge_expired(&self, before: DateTime<Utc>) -> AppResult<u64> {
        self.purged_before.lock().await.push(before);

        let mut records = self.records.lock().await;
        let initial = records.len();
        records.retain(|_, record| record.last_reset() >= before);

        Ok(u64::try_from(initial - records.len()).unwrap_or(u64::MAX))
    }
}

#[derive(Default)]
pub(crate) struct FakeAuthEventRepository {
    pub(crate) events: Mutex<Vec<AuthEvent>>,
    pub(crate) fail: AtomicBool,
}

#[async_trait]
impl AuthEventRepository for FakeAuthEventRepository {
    async fn append_event(&self, event: AuthEvent) -> AppResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Internal("audit sink is unavailable".to_owned()));
        }

        self.events.lock().await.push(event);
        Ok(())
    }
}

pub(crate) struct FakeCredentialVerifier {
    pub(crate) user: UserRecord,
    pub(crate) password: String,
    pub(crate) calls: AtomicUsize,
}

impl FakeCredentialVerifier {
    pub(crate) fn new(email: &str, password: &str) -> Self {
        Self {
            user: UserRecord {
                id: UserId::new(),
                email: email.to_owned(),
            },
            password: password.to_owned(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CredentialVerifier for FakeCredentialVerifier {
    async fn verify(&self, email: &EmailAddress, password: &str) -> AppResult<Option<UserRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        Ok((email.as_str() == self.user.email && password == self.password)
            .then(|| self.user.clone()))
    }
}
